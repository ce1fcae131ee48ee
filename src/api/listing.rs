//! Purpose: Fetch listing pages and append decoded posts to a `LinkList`.
//! Exports: `ListingClient`, `fetch_listing`, `listing_locator`, `decode_link`, `LINK_KIND`.
//! Role: Wires the listing envelope shape into binding tables and drives pagination.
//! Invariants: Only children tagged `t3` are appended, in server order; others are discarded.
//! Invariants: Every child is fully decoded regardless of key order, so its subtree is consumed.
//! Invariants: Decode errors in a child only fail the page when the child is a `t3`.
//! Invariants: Failures surface as `ErrorKind::Response`; links appended before the failure stay.
use std::cell::Cell;

use crate::api::link::{Link, LinkFlags, LinkList};
use crate::api::transport::{Transport, run_request};
use crate::core::binding::BindingTable;
use crate::core::cursor::TokenCursor;
use crate::core::error::Error;
use crate::core::token::TokenKind;

pub const LINK_KIND: &str = "t3";
const JSON_SUFFIX: &str = "/.json";

/// Path and query for the next page of `list`.
pub fn listing_locator(list: &LinkList) -> String {
    let mut locator = String::new();
    if let Some(subreddit) = list.subreddit() {
        locator.push_str(subreddit);
    }
    locator.push_str(list.listing().path_suffix());
    locator.push_str(JSON_SUFFIX);
    if let Some(fullname) = list.last().and_then(Link::fullname) {
        locator.push_str("?after=");
        locator.push_str(&fullname);
    }
    locator
}

/// Fetch one page into `list`, returning how many links were appended.
pub fn fetch_listing<T>(transport: &T, list: &mut LinkList) -> Result<usize, Error>
where
    T: Transport + ?Sized,
{
    let locator = listing_locator(list);
    let before = list.len();
    let mut modhash = None;
    let mut kind = None;

    let result = run_request(
        transport,
        &locator,
        &mut BindingTable::new()
            .string("modhash", &mut modhash)
            .string("kind", &mut kind)
            .nested("data", &mut *list, decode_listing_data),
    );

    if let Some(modhash) = modhash {
        list.set_modhash(modhash);
    }
    let appended = list.len() - before;
    match result {
        Ok(()) => {
            tracing::debug!(%locator, appended, total = list.len(), "listing page decoded");
            Ok(appended)
        }
        Err(err) => {
            tracing::warn!(%locator, appended, error = %err, "listing fetch failed");
            Err(Error::response(err))
        }
    }
}

fn decode_listing_data(cursor: &mut TokenCursor<'_>, list: &mut LinkList) -> Result<(), Error> {
    let mut modhash = None;
    BindingTable::new()
        .string("modhash", &mut modhash)
        .nested("children", &mut *list, decode_children)
        .decode(cursor)?;
    if let Some(modhash) = modhash {
        list.set_modhash(modhash);
    }
    Ok(())
}

fn decode_children(cursor: &mut TokenCursor<'_>, list: &mut LinkList) -> Result<(), Error> {
    let children = cursor.expect(TokenKind::Array)?;
    for _ in 0..children.size {
        let mut kind: Option<String> = None;
        let mut decoded: Option<Result<Link, Error>> = None;
        BindingTable::new()
            .string("kind", &mut kind)
            .nested("data", &mut decoded, decode_child_data)
            .decode(cursor)?;

        match (kind.as_deref(), decoded) {
            (Some(LINK_KIND), Some(Ok(link))) => list.push(link),
            (Some(LINK_KIND), Some(Err(err))) => return Err(err),
            (kind, Some(Err(err))) => tracing::trace!(
                kind = kind.unwrap_or(""),
                error = %err,
                "discarding non-post child that did not decode as a post"
            ),
            (kind, _) => tracing::trace!(kind = kind.unwrap_or(""), "discarding non-post child"),
        }
    }
    Ok(())
}

// The decode error is held until the child's kind is known; the cursor always
// ends past the data subtree.
fn decode_child_data(
    cursor: &mut TokenCursor<'_>,
    decoded: &mut Option<Result<Link, Error>>,
) -> Result<(), Error> {
    let end = cursor.skip(cursor.position())?;
    let link = decode_link(cursor);
    if link.is_err() {
        cursor.seek(end)?;
    }
    *decoded = Some(link);
    Ok(())
}

/// Decode one post object at the cursor.
pub fn decode_link(cursor: &mut TokenCursor<'_>) -> Result<Link, Error> {
    let mut link = Link::default();
    let flags = Cell::new(LinkFlags::empty());
    BindingTable::new()
        .string("selftext", &mut link.selftext)
        .string("title", &mut link.title)
        .string("id", &mut link.id)
        .string("permalink", &mut link.permalink)
        .string("author", &mut link.author)
        .string("url", &mut link.url)
        .int("score", &mut link.score)
        .int("downs", &mut link.downs)
        .int("ups", &mut link.ups)
        .int("num_comments", &mut link.num_comments)
        .int("num_reports", &mut link.num_reports)
        .flag("is_self", &flags, LinkFlags::IS_SELF)
        .flag("over_18", &flags, LinkFlags::OVER_18)
        .flag("clicked", &flags, LinkFlags::CLICKED)
        .flag("stickied", &flags, LinkFlags::STICKIED)
        .flag("edited", &flags, LinkFlags::EDITED)
        .flag("hidden", &flags, LinkFlags::HIDDEN)
        .flag("distinguished", &flags, LinkFlags::DISTINGUISHED)
        .decode(cursor)?;
    link.flags = flags.get();
    Ok(link)
}

/// Listing fetches bound to one transport.
#[derive(Clone, Debug)]
pub struct ListingClient<T> {
    transport: T,
}

impl<T: Transport> ListingClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn locator(&self, list: &LinkList) -> String {
        listing_locator(list)
    }

    pub fn fetch(&self, list: &mut LinkList) -> Result<usize, Error> {
        fetch_listing(&self.transport, list)
    }

    /// Fetch up to `pages` pages in sequence. Stops early on an empty page, or
    /// when the last link has no id to continue from.
    pub fn fetch_pages(&self, list: &mut LinkList, pages: usize) -> Result<usize, Error> {
        let mut total = 0;
        for page in 0..pages {
            let appended = self.fetch(list)?;
            total += appended;
            if appended == 0 {
                tracing::debug!(page, "empty page, stopping pagination");
                break;
            }
            if list.last().and_then(|link| link.id.as_deref()).is_none() {
                tracing::debug!(page, "last link has no id, stopping pagination");
                break;
            }
        }
        Ok(total)
    }
}
