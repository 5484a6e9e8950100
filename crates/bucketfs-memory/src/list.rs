//! Delimiter listing over a sorted key space.

use std::collections::BTreeMap;
use std::ops::Bound;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bucketfs_core::{ListPage, ListRequest, StoreError, StoreResult};

use crate::store::StoredObject;

/// Largest page a single LIST returns, as on S3.
const MAX_KEYS_LIMIT: usize = 1000;

/// Encode an object key or common prefix as a continuation token.
pub(crate) fn encode_continuation_token(key: &str) -> String {
    BASE64_STANDARD.encode(key.as_bytes())
}

/// Decode a continuation token back to the key it was issued after.
pub(crate) fn decode_continuation_token(token: &str) -> StoreResult<String> {
    let bytes = BASE64_STANDARD
        .decode(token)
        .map_err(|_| StoreError::InvalidArgument {
            message: "Invalid continuation token".to_owned(),
        })?;
    String::from_utf8(bytes).map_err(|_| StoreError::InvalidArgument {
        message: "Continuation token contains invalid UTF-8".to_owned(),
    })
}

/// Build one page of `request` from `objects`.
///
/// Objects and common prefixes both count toward `max_keys`, and the
/// continuation token resumes strictly after the last returned entry.
pub(crate) fn list_from_btree(
    objects: &BTreeMap<String, StoredObject>,
    request: &ListRequest,
) -> StoreResult<ListPage> {
    let start_after = match &request.continuation_token {
        Some(token) => decode_continuation_token(token)?,
        None => String::new(),
    };
    let max_keys = request.max_keys.min(MAX_KEYS_LIMIT);
    let prefix = request.prefix.as_str();
    let delimiter = request.delimiter.as_deref().filter(|d| !d.is_empty());

    let mut page = ListPage::default();
    if max_keys == 0 {
        return Ok(page);
    }

    // A token equal to the prefix was issued after the prefix's own marker.
    let lower = if request.continuation_token.is_some() && start_after.as_str() >= prefix {
        Bound::Excluded(start_after.clone())
    } else {
        Bound::Included(prefix.to_owned())
    };

    let mut count = 0usize;
    let mut last_entry: Option<String> = None;

    for (key, object) in objects.range((lower, Bound::Unbounded)) {
        if !key.starts_with(prefix) {
            break;
        }

        if let Some(delimiter) = delimiter {
            let after_prefix = &key[prefix.len()..];
            if let Some(pos) = after_prefix.find(delimiter) {
                let cp = format!("{prefix}{}{delimiter}", &after_prefix[..pos]);
                // Keys under one prefix are contiguous, so only the last
                // emitted prefix can repeat.
                if cp.as_str() <= start_after.as_str()
                    || last_entry.as_deref() == Some(cp.as_str())
                {
                    continue;
                }
                if count >= max_keys {
                    page.is_truncated = true;
                    break;
                }
                page.common_prefixes.push(cp.clone());
                last_entry = Some(cp);
                count += 1;
                continue;
            }
        }

        if count >= max_keys {
            page.is_truncated = true;
            break;
        }
        page.objects.push(object.meta(key));
        last_entry = Some(key.clone());
        count += 1;
    }

    if page.is_truncated {
        page.next_continuation_token = last_entry.as_deref().map(encode_continuation_token);
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn keyspace(keys: &[&str]) -> BTreeMap<String, StoredObject> {
        keys.iter()
            .map(|k| ((*k).to_owned(), StoredObject::new(Bytes::new(), Default::default())))
            .collect()
    }

    #[test]
    fn test_should_roundtrip_continuation_token() {
        let token = encode_continuation_token("photos/2024/");
        assert_eq!(decode_continuation_token(&token).unwrap(), "photos/2024/");
        assert!(decode_continuation_token("!!!not-base64!!!").is_err());
    }

    #[test]
    fn test_should_group_by_delimiter() {
        let objects = keyspace(&["a/1", "a/2", "b", "c/x/y", "c/z"]);
        let page = list_from_btree(&objects, &ListRequest::children("", 100)).unwrap();
        assert_eq!(page.common_prefixes, vec!["a/", "c/"]);
        assert_eq!(
            page.objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(),
            vec!["b"]
        );
        assert!(!page.is_truncated);
        assert!(page.next_continuation_token.is_none());
    }

    #[test]
    fn test_should_include_marker_under_prefix() {
        let objects = keyspace(&["dir/", "dir/a", "dir/sub/", "dir10/x"]);
        let page = list_from_btree(&objects, &ListRequest::children("dir/", 100)).unwrap();
        assert_eq!(page.common_prefixes, vec!["dir/sub/"]);
        assert_eq!(
            page.objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(),
            vec!["dir/", "dir/a"]
        );
    }

    #[test]
    fn test_should_paginate_prefixes_and_objects() {
        let objects = keyspace(&["d1/", "d2/a", "d2/b", "d3/", "f1", "f2"]);
        let mut request = ListRequest::children("", 2);
        let mut seen = Vec::new();

        loop {
            let page = list_from_btree(&objects, &request).unwrap();
            assert!(page.common_prefixes.len() + page.objects.len() <= 2);
            seen.extend(page.common_prefixes.iter().cloned());
            seen.extend(page.objects.iter().map(|o| o.key.clone()));
            if !page.is_truncated {
                break;
            }
            request.continuation_token = page.next_continuation_token;
        }

        assert_eq!(seen, vec!["d1/", "d2/", "d3/", "f1", "f2"]);
    }

    #[test]
    fn test_should_resume_after_marker_equal_to_prefix() {
        let objects = keyspace(&["d/", "d/sub/a", "d/x"]);
        let mut request = ListRequest::children("d/", 1);
        let mut seen = Vec::new();

        for _ in 0..10 {
            let page = list_from_btree(&objects, &request).unwrap();
            seen.extend(page.common_prefixes.iter().cloned());
            seen.extend(page.objects.iter().map(|o| o.key.clone()));
            if !page.is_truncated {
                break;
            }
            request.continuation_token = page.next_continuation_token;
        }

        assert_eq!(seen, vec!["d/", "d/sub/", "d/x"]);
    }

    #[test]
    fn test_should_list_without_delimiter() {
        let objects = keyspace(&["a/1", "a/2/3", "b"]);
        let request = ListRequest {
            prefix: "a/".to_owned(),
            max_keys: 10,
            ..ListRequest::default()
        };
        let page = list_from_btree(&objects, &request).unwrap();
        assert!(page.common_prefixes.is_empty());
        assert_eq!(page.objects.len(), 2);
    }

    #[test]
    fn test_should_return_empty_page_for_zero_max_keys() {
        let objects = keyspace(&["a"]);
        let page = list_from_btree(&objects, &ListRequest::children("", 0)).unwrap();
        assert_eq!(page, ListPage::default());
    }
}
