//! Purpose: Render links and link lists as stable JSON objects for CLI output.
//! Exports: `link_json`, `link_list_json`.
//! Invariants: Absent strings render as `null`; flags render as individual booleans.
use redlist::api::{Link, LinkFlags, LinkList};
use serde_json::{Map, Value, json};

const FLAG_FIELDS: [(&str, LinkFlags); 7] = [
    ("is_self", LinkFlags::IS_SELF),
    ("over_18", LinkFlags::OVER_18),
    ("clicked", LinkFlags::CLICKED),
    ("stickied", LinkFlags::STICKIED),
    ("edited", LinkFlags::EDITED),
    ("hidden", LinkFlags::HIDDEN),
    ("distinguished", LinkFlags::DISTINGUISHED),
];

pub(super) fn link_json(link: &Link) -> Value {
    let mut map = Map::new();
    map.insert("id".to_string(), json!(link.id));
    map.insert("title".to_string(), json!(link.title));
    map.insert("author".to_string(), json!(link.author));
    map.insert("url".to_string(), json!(link.url));
    map.insert("permalink".to_string(), json!(link.permalink));
    map.insert("selftext".to_string(), json!(link.selftext));
    map.insert("score".to_string(), json!(link.score));
    map.insert("ups".to_string(), json!(link.ups));
    map.insert("downs".to_string(), json!(link.downs));
    map.insert("num_comments".to_string(), json!(link.num_comments));
    map.insert("num_reports".to_string(), json!(link.num_reports));
    for (name, flag) in FLAG_FIELDS {
        map.insert(name.to_string(), json!(link.flags.contains(flag)));
    }
    Value::Object(map)
}

pub(super) fn link_list_json(list: &LinkList) -> Value {
    let links = list.iter().map(link_json).collect::<Vec<_>>();
    json!({
        "subreddit": list.subreddit(),
        "sort": list.listing().as_str(),
        "count": list.len(),
        "modhash": list.modhash(),
        "links": links,
    })
}

#[cfg(test)]
mod tests {
    use super::{link_json, link_list_json};
    use redlist::api::{Link, LinkFlags, LinkList, ListingType};

    #[test]
    fn link_json_has_flags_and_nulls() {
        let link = Link {
            id: Some("abc".to_string()),
            score: 7,
            flags: LinkFlags::OVER_18,
            ..Link::default()
        };
        let value = link_json(&link);
        assert_eq!(value["id"], "abc");
        assert!(value["title"].is_null());
        assert_eq!(value["score"], 7);
        assert_eq!(value["over_18"], true);
        assert_eq!(value["is_self"], false);
    }

    #[test]
    fn link_list_json_reports_scope_and_count() {
        let mut list = LinkList::new("/r/test", ListingType::Top);
        list.push(Link::default());
        let value = link_list_json(&list);
        assert_eq!(value["subreddit"], "/r/test");
        assert_eq!(value["sort"], "top");
        assert_eq!(value["count"], 1);
        assert!(value["modhash"].is_null());
        assert_eq!(value["links"].as_array().map(Vec::len), Some(1));
    }
}
