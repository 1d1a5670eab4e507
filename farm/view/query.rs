//! Farm list selection as stored in the address bar:
//! `?type=active&tab=elastic&search=usdc&orderBy=apr&orderDirection=desc`.

use std::fmt;

use crate::{
    filter::{
        FarmFilter,
        FarmStatus,
    },
    sort::{
        SortDirection,
        SortField,
        SortState,
    },
};

const TYPE: &str = "type";
const TAB: &str = "tab";
const SEARCH: &str = "search";
const ORDER_BY: &str = "orderBy";
const ORDER_DIRECTION: &str = "orderDirection";

/// Farm family shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FarmTab {
    #[default]
    Elastic,
    Classic,
}

impl FarmTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            FarmTab::Elastic => "elastic",
            FarmTab::Classic => "classic",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "elastic" => Some(FarmTab::Elastic),
            "classic" => Some(FarmTab::Classic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FarmQuery {
    pub status: FarmStatus,
    pub tab: FarmTab,
    pub search: String,
    pub sort: SortState,
    /// Parameters owned by other parts of the page, kept in order.
    pub other: Vec<(String, String)>,
}

impl FarmQuery {
    /// Parses a query string, with or without the leading `?`.
    /// Unknown values fall back to defaults; unknown keys are kept.
    pub fn parse(query: &str) -> Self {
        let mut parsed = FarmQuery::default();
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let (key, value) = (decode(key), decode(value));
            match key.as_str() {
                TYPE => parsed.status = value.parse().unwrap_or_default(),
                TAB => parsed.tab = FarmTab::parse(&value).unwrap_or_default(),
                SEARCH => parsed.search = value,
                ORDER_BY => parsed.sort.field = value.parse().unwrap_or_default(),
                ORDER_DIRECTION => parsed.sort.direction = value.parse().unwrap_or_default(),
                _ => parsed.other.push((key, value)),
            }
        }
        parsed
    }

    pub fn filter(&self, staked_only: bool) -> FarmFilter {
        FarmFilter {
            status: self.status,
            search: self.search.clone(),
            staked_only,
        }
    }

    /// Sort header click, see [`SortState::toggle`].
    pub fn toggle_sort(&mut self, field: SortField) {
        self.sort.toggle(field);
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: FarmStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.sort.direction = direction;
        self
    }
}

/// Renders without the leading `?`. An empty search is omitted.
impl fmt::Display for FarmQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TYPE}={}&{TAB}={}",
            self.status.as_str(),
            self.tab.as_str()
        )?;
        if !self.search.is_empty() {
            write!(f, "&{SEARCH}={}", encode(&self.search))?;
        }
        write!(
            f,
            "&{ORDER_BY}={}&{ORDER_DIRECTION}={}",
            self.sort.field.as_str(),
            self.sort.direction.as_str()
        )?;
        for (key, value) in &self.other {
            write!(f, "&{}={}", encode(key), encode(value))?;
        }
        Ok(())
    }
}

fn encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Percent-decoding; `+` is a space. Malformed escapes are kept verbatim.
fn decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let escaped = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match escaped {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
