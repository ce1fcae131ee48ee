//! Purpose: Entity model for listing pages: `Link` posts and the `LinkList` aggregate.
//! Exports: `Link`, `LinkFlags`, `LinkList`, `ListingType`.
//! Role: Owned, append-only destination for the listing decode pass.
//! Invariants: Links are appended only at the tail; removal is bulk `clear_links` only.
//! Invariants: `clear_links` keeps scope, listing type, and modhash for reuse.
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::core::error::{Error, ErrorKind};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LinkFlags: u8 {
        const IS_SELF       = 0b000_0001;
        const OVER_18       = 0b000_0010;
        const CLICKED       = 0b000_0100;
        const STICKIED      = 0b000_1000;
        const EDITED        = 0b001_0000;
        const HIDDEN        = 0b010_0000;
        const DISTINGUISHED = 0b100_0000;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    pub selftext: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
    pub permalink: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub score: i64,
    pub downs: i64,
    pub ups: i64,
    pub num_comments: i64,
    pub num_reports: i64,
    pub flags: LinkFlags,
}

impl Link {
    /// Fullname used by the API for pagination, e.g. `t3_abc`.
    pub fn fullname(&self) -> Option<String> {
        self.id.as_deref().map(|id| format!("{}_{id}", super::listing::LINK_KIND))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ListingType {
    #[default]
    Hot,
    New,
    Rising,
    Controversial,
    Top,
}

impl ListingType {
    pub const ALL: [ListingType; 5] = [
        ListingType::Hot,
        ListingType::New,
        ListingType::Rising,
        ListingType::Controversial,
        ListingType::Top,
    ];

    pub fn path_suffix(self) -> &'static str {
        match self {
            ListingType::Hot => "",
            ListingType::New => "/new",
            ListingType::Rising => "/rising",
            ListingType::Controversial => "/controversial",
            ListingType::Top => "/top",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListingType::Hot => "hot",
            ListingType::New => "new",
            ListingType::Rising => "rising",
            ListingType::Controversial => "controversial",
            ListingType::Top => "top",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ListingType::ALL
            .into_iter()
            .find(|listing| listing.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown listing type `{value}`"))
                    .with_hint("Use one of: hot, new, rising, controversial, top.")
            })
    }
}

#[derive(Clone, Debug, Default)]
pub struct LinkList {
    links: Vec<Link>,
    subreddit: Option<String>,
    listing: ListingType,
    modhash: Option<String>,
}

impl LinkList {
    /// An empty list scoped to `subreddit` (`/r/name`, or empty for the front page).
    pub fn new(subreddit: impl Into<String>, listing: ListingType) -> Self {
        let subreddit = subreddit.into();
        Self {
            links: Vec::new(),
            subreddit: (!subreddit.is_empty()).then_some(subreddit),
            listing,
            modhash: None,
        }
    }

    pub fn front_page(listing: ListingType) -> Self {
        Self::new(String::new(), listing)
    }

    pub fn subreddit(&self) -> Option<&str> {
        self.subreddit.as_deref()
    }

    pub fn listing(&self) -> ListingType {
        self.listing
    }

    pub fn modhash(&self) -> Option<&str> {
        self.modhash.as_deref()
    }

    pub(crate) fn set_modhash(&mut self, modhash: String) {
        self.modhash = Some(modhash);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn first(&self) -> Option<&Link> {
        self.links.first()
    }

    pub fn last(&self) -> Option<&Link> {
        self.links.last()
    }

    pub fn get(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.links.iter()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn push(&mut self, link: Link) {
        self.links.push(link);
    }

    pub fn clear_links(&mut self) {
        self.links.clear();
    }
}

impl<'a> IntoIterator for &'a LinkList {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
