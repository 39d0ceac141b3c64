//! Security token extraction from served HTML.
//!
//! The portal embeds its anti-forgery token in a `<meta name="csrf-token">`
//! element and, on some login variants, an account confirmation token in a
//! hidden `<input name="account">` field. Attributes are always resolved by
//! name; their order in the markup is irrelevant.

use std::fmt;

use scraper::{ElementRef, Html};

use crate::error::TokenNotFound;

/// The kinds of token the negotiator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `<meta name="csrf-token" content="...">`
    Csrf,
    /// `<input name="account" value="...">`
    Account,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Csrf => "csrf-token",
            TokenKind::Account => "account",
        }
    }

    /// Classify an element, returning the kind and the attribute holding its value.
    fn classify(element: &ElementRef<'_>) -> Option<(TokenKind, &'static str)> {
        let el = element.value();
        match (el.name(), el.attr("name")?) {
            ("meta", "csrf-token") => Some((TokenKind::Csrf, "content")),
            ("input", "account") => Some((TokenKind::Account, "value")),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token found in one document.
#[derive(Clone, PartialEq, Eq)]
pub struct ScrapedToken {
    pub kind: TokenKind,
    pub value: String,
}

// Token values are secrets
impl fmt::Debug for ScrapedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapedToken")
            .field("kind", &self.kind)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// All tokens found in one document, in document order.
#[derive(Debug, Clone, Default)]
pub struct ScrapedTokens {
    tokens: Vec<ScrapedToken>,
}

impl ScrapedTokens {
    /// Returns the value of the last token of `kind` in document order.
    pub fn find(&self, kind: TokenKind) -> Option<&str> {
        self.tokens
            .iter()
            .rev()
            .find(|t| t.kind == kind)
            .map(|t| t.value.as_str())
    }

    /// Like [`find`](Self::find) but fails with [`TokenNotFound`].
    pub fn require(&self, kind: TokenKind) -> Result<&str, TokenNotFound> {
        self.find(kind).ok_or(TokenNotFound { kind })
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        self.find(kind).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// Parse an HTML document and collect every recognised token.
///
/// Every element node is visited depth-first, so tokens nested at any depth
/// are found. Elements with an empty value attribute are skipped.
pub fn scrape_tokens(html: &str) -> ScrapedTokens {
    let document = Html::parse_document(html);

    let tokens = document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .fold(Vec::new(), |mut acc, element| {
            if let Some(token) = extract(&element) {
                acc.push(token);
            }
            acc
        });

    ScrapedTokens { tokens }
}

fn extract(element: &ElementRef<'_>) -> Option<ScrapedToken> {
    let (kind, value_attr) = TokenKind::classify(element)?;
    let value = element.value().attr(value_attr)?;
    if value.is_empty() {
        return None;
    }
    Some(ScrapedToken {
        kind,
        value: value.to_string(),
    })
}
