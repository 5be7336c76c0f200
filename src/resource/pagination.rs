//! Lazy listing
//!
//! A listing is a [`ResourceStream`]: pages are fetched one at a time, only
//! when the caller pulls past the end of the previous page. Dropping the
//! stream stops the listing.

use super::attribute::Location;
use super::base::{Attrs, Resource};
use super::schema::{NextMarker, Operation, Schema};
use crate::error::Result;
use crate::session::{RequestOptions, Session};
use crate::utils::{is_truthy, query_pairs, value_as_i64};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

pub type ResourceStream<'a> = BoxStream<'a, Result<Resource>>;

/// Follow a dotted accessor (`"links.next"`) into a decoded body.
///
/// A missing key yields an empty object, a non-object on the way yields `None`.
pub fn find_value_by_accessor<'v>(input: &'v Value, accessor: &str) -> Option<&'v Value> {
    static EMPTY: Value = Value::Null;
    let mut current = input;
    for chunk in accessor.split('.') {
        match current {
            Value::Object(map) => current = map.get(chunk).unwrap_or(&EMPTY),
            Value::Null => return Some(&EMPTY),
            _ => return None,
        }
    }
    Some(current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Marker,
    Offset,
}

enum PageState {
    Fetching(Attrs),
    Yielding {
        page: VecDeque<Resource>,
        next: Option<Attrs>,
    },
    Done,
}

struct Pager<'a> {
    session: &'a Session,
    schema: Arc<Schema>,
    uri: String,
    uri_values: Attrs,
    paginated: bool,
    mode: Mode,
    opts: RequestOptions,
}

impl Resource {
    /// List resources of a type.
    ///
    /// `params` are transposed through the schema's query mapping; values
    /// for uri attributes also fill the path template and are carried by
    /// every listed resource. With `paginated` unset only the first page is
    /// fetched.
    pub fn list(
        session: &Session,
        schema: Arc<Schema>,
        paginated: bool,
        params: Attrs,
    ) -> Result<ResourceStream<'_>> {
        start(session, schema, paginated, params, Mode::Marker, RequestOptions::new())
    }

    /// [`Resource::list`] sending `opts` headers with every page request
    pub fn list_with(
        session: &Session,
        schema: Arc<Schema>,
        paginated: bool,
        params: Attrs,
        opts: RequestOptions,
    ) -> Result<ResourceStream<'_>> {
        start(session, schema, paginated, params, Mode::Marker, opts)
    }

    /// List resources of a type whose server pages by an `offset` page index
    /// instead of a marker
    pub fn list_by_offset(
        session: &Session,
        schema: Arc<Schema>,
        paginated: bool,
        params: Attrs,
    ) -> Result<ResourceStream<'_>> {
        start(session, schema, paginated, params, Mode::Offset, RequestOptions::new())
    }
}

/// Collection path for a list call, with uri placeholders filled from `params`
pub fn get_list_uri(schema: &Schema, params: &Attrs) -> Result<String> {
    schema.list_uri(&path_values(schema, params))
}

/// Cursor found in a list response, if the schema declares where to look
pub fn get_next_marker(schema: &Schema, body: &Value, yielded: usize, query: &Attrs) -> Option<Value> {
    match schema.next_marker.as_ref()? {
        NextMarker::Path(path) => find_value_by_accessor(body, path).cloned(),
        NextMarker::StartNumber(total_path) => {
            let total = find_value_by_accessor(body, total_path).and_then(value_as_i64)?;
            let start = query
                .get(&schema.query_marker_key)
                .and_then(value_as_i64)
                .unwrap_or(0);
            let next = start + yielded as i64;
            Some(Value::from(if next >= total { -1 } else { next }))
        },
    }
}

/// `params` plus the wire names of any uri attributes among them
fn path_values(schema: &Schema, params: &Attrs) -> Attrs {
    let mut values = params.clone();
    for attribute in schema.attributes_in(Location::Uri) {
        if let Some(value) = params.get(&attribute.attr) {
            values.insert(attribute.wire_name().to_string(), value.clone());
        }
    }
    values
}

fn start(
    session: &Session,
    schema: Arc<Schema>,
    paginated: bool,
    params: Attrs,
    mode: Mode,
    opts: RequestOptions,
) -> Result<ResourceStream<'_>> {
    schema.require(Operation::List)?;

    let query = schema.query.transpose(&params);
    let uri = get_list_uri(&schema, &params)?;
    let uri_values: Attrs = schema
        .attributes_in(Location::Uri)
        .filter_map(|a| {
            params
                .get(&a.attr)
                .or_else(|| params.get(a.wire_name()))
                .map(|v| (a.wire_name().to_string(), v.clone()))
        })
        .collect();

    let pager = Pager {
        session,
        schema,
        uri,
        uri_values,
        paginated,
        mode,
        opts,
    };

    let stream = stream::unfold((pager, PageState::Fetching(query)), |(pager, mut state)| async move {
        loop {
            state = match state {
                PageState::Done => return None,
                PageState::Yielding { mut page, next } => match page.pop_front() {
                    Some(item) => return Some((Ok(item), (pager, PageState::Yielding { page, next }))),
                    None => match next {
                        Some(query) => PageState::Fetching(query),
                        None => PageState::Done,
                    },
                },
                PageState::Fetching(query) => match pager.fetch(query).await {
                    Ok((page, next)) => PageState::Yielding {
                        page: page.into(),
                        next,
                    },
                    Err(e) => return Some((Err(e), (pager, PageState::Done))),
                },
            };
        }
    });

    Ok(stream.boxed())
}

impl Pager<'_> {
    /// Fetch one page; returns its resources and the query for the next page
    async fn fetch(&self, query: Attrs) -> Result<(Vec<Resource>, Option<Attrs>)> {
        tracing::debug!("Listing {} page: {:?}", self.schema.type_name, query);

        let opts = self
            .opts
            .clone()
            .default_header("Accept", "application/json")
            .params(query_pairs(&query));
        let response = self
            .session
            .get(&self.schema.service, &self.uri, opts)
            .await?;
        let body = response.json()?;

        let page = self.resources(&body);
        let next = match self.mode {
            Mode::Marker => self.next_marker_query(&body, &page, query),
            Mode::Offset => self.next_offset_query(page.len(), query),
        };
        Ok((page, next))
    }

    fn resources(&self, body: &Value) -> Vec<Resource> {
        let items = match &self.schema.resources_key {
            Some(key) => find_value_by_accessor(body, key),
            None => Some(body),
        };
        let Some(Value::Array(items)) = items else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| {
                let mut data = match item {
                    Value::Object(map) => map.clone(),
                    _ => return None,
                };
                // some services return a `self` link per item
                data.remove("self");
                if let Some(key) = &self.schema.resource_key {
                    if let Some(Value::Object(inner)) = data.get(key) {
                        data = inner.clone();
                    }
                }
                for (k, v) in &self.uri_values {
                    data.entry(k.clone()).or_insert_with(|| v.clone());
                }
                Some(Resource::existing(self.schema.clone(), data))
            })
            .collect()
    }

    fn next_marker_query(&self, body: &Value, page: &[Resource], mut query: Attrs) -> Option<Attrs> {
        let yielded = page.len();
        if yielded == 0 {
            return None;
        }

        let mut new_marker = page.last().and_then(Resource::id).map(Value::String);
        if let Some(next) = get_next_marker(&self.schema, body, yielded, &query) {
            if is_truthy(&next) {
                new_marker = if next.as_i64() == Some(-1) { None } else { Some(next) };
            }
        }

        let new_marker = new_marker.filter(is_truthy)?;
        if !self.paginated {
            return None;
        }
        let limit_key = &self.schema.query_limit_key;
        if let Some(limit) = query.get(limit_key).and_then(value_as_i64) {
            if (yielded as i64) < limit {
                return None;
            }
        }

        query.insert(limit_key.clone(), Value::from(yielded));
        query.insert(self.schema.query_marker_key.clone(), new_marker);
        Some(query)
    }

    fn next_offset_query(&self, yielded: usize, mut query: Attrs) -> Option<Attrs> {
        if yielded == 0 || !self.paginated {
            return None;
        }
        let offset = query.get("offset").and_then(value_as_i64)?;
        let limit = query.get(&self.schema.query_limit_key).and_then(value_as_i64)?;
        if (yielded as i64) < limit {
            return None;
        }
        query.insert("offset".to_string(), Value::from(offset + 1));
        Some(query)
    }
}
