// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print requests as they arrive, and the validated jobs built from them.

use std::collections::HashMap;

use labelwerk_core::error::{LabelwerkError, Result};
use labelwerk_core::types::{ImageId, JobId, JobOptions, LabelSize};
use labelwerk_document::Filter;

/// How boolean options are encoded by the submitting route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    /// Query strings: a flag is set when the key is present at all.
    Presence,
    /// Form fields: a flag is set when its value is `on` or `true`.
    Truthy,
}

/// Raw request options, first value per key.
#[derive(Debug, Clone)]
pub struct RequestParams {
    fields: HashMap<String, String>,
    style: FlagStyle,
}

impl RequestParams {
    pub fn new<I, K, V>(pairs: I, style: FlagStyle) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = HashMap::new();
        for (key, value) in pairs {
            fields.entry(key.into()).or_insert_with(|| value.into());
        }
        Self { fields, style }
    }

    /// Options from a query string (`?resize&x=400`).
    pub fn from_query<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(pairs, FlagStyle::Presence)
    }

    /// Options from HTML form fields (`resize=on`).
    pub fn from_form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(pairs, FlagStyle::Truthy)
    }

    fn value(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn flag(&self, key: &str) -> bool {
        match self.style {
            FlagStyle::Presence => self.fields.contains_key(key),
            FlagStyle::Truthy => matches!(self.value(key), Some("on" | "true")),
        }
    }

    pub fn options(&self) -> JobOptions {
        JobOptions {
            resize: self.flag("resize"),
            stretch: self.flag("stretch"),
            rotate: self.flag("rotate"),
            center_horizontal: self.flag("centerh"),
            center_vertical: self.flag("centerv"),
            tiling: self.flag("tiling"),
        }
    }

    pub fn public(&self) -> bool {
        self.flag("public")
    }

    pub fn filter(&self) -> Option<Filter> {
        Filter::resolve(self.value("dither"))
    }

    /// Labels to feed after printing; one when absent.
    pub fn page_feeds(&self) -> Result<u32> {
        match self.value("pf") {
            None => Ok(1),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| LabelwerkError::InvalidRequest(format!("Invalid PF Count: {e}"))),
        }
    }

    pub fn label_size(&self) -> Result<LabelSize> {
        let x = self.value("x").filter(|v| !v.is_empty());
        let y = self.value("y").filter(|v| !v.is_empty());
        let (Some(x), Some(y)) = (x, y) else {
            return Err(LabelwerkError::InvalidRequest(
                "No Size of Label Specified".into(),
            ));
        };
        let width = parse_edge(x)
            .map_err(|e| LabelwerkError::InvalidRequest(format!("Invalid width: {e}")))?;
        let height = parse_edge(y)
            .map_err(|e| LabelwerkError::InvalidRequest(format!("Invalid height: {e}")))?;
        Ok(LabelSize::new(width, height))
    }
}

/// A label edge in pixels: an integer in `1..=LabelSize::MAX_EDGE`.
fn parse_edge(raw: &str) -> std::result::Result<u32, String> {
    let value: u32 = raw.trim().parse().map_err(|e| format!("{e}"))?;
    if value == 0 || value > LabelSize::MAX_EDGE {
        return Err(format!("{value} is outside 1..={}", LabelSize::MAX_EDGE));
    }
    Ok(value)
}

/// A submission as handed over by the HTTP layer.
#[derive(Debug)]
pub struct PrintRequest {
    /// Upload bytes, or the reason they could not be read.
    pub body: std::result::Result<Vec<u8>, String>,
    pub params: RequestParams,
    /// Client-side filename, if any.
    pub filename: Option<String>,
}

/// A validated job waiting in the queue.
#[derive(Debug)]
pub struct PrintJob {
    pub id: JobId,
    /// Encoded upload bytes.
    pub data: Vec<u8>,
    /// Format tag of the upload, e.g. `png`.
    pub format: String,
    pub label: LabelSize,
    pub page_feeds: u32,
    pub options: JobOptions,
    pub filter: Option<Filter>,
    pub public: bool,
    pub name: Option<String>,
    /// The stored upload this job renders.
    pub original: ImageId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> RequestParams {
        RequestParams::from_query(pairs.iter().copied())
    }

    fn form(pairs: &[(&str, &str)]) -> RequestParams {
        RequestParams::from_form(pairs.iter().copied())
    }

    fn message(err: LabelwerkError) -> String {
        err.message()
    }

    #[test]
    fn query_flags_count_when_present() {
        let params = query(&[("resize", ""), ("centerh", "no"), ("x", "1"), ("y", "1")]);
        let options = params.options();
        assert!(options.resize);
        assert!(options.center_horizontal);
        assert!(!options.stretch);
        assert!(!params.public());
    }

    #[test]
    fn form_flags_need_on_or_true() {
        let params = form(&[
            ("resize", "on"),
            ("stretch", "true"),
            ("rotate", "off"),
            ("public", ""),
        ]);
        let options = params.options();
        assert!(options.resize);
        assert!(options.stretch);
        assert!(!options.rotate);
        assert!(!params.public());
    }

    #[test]
    fn first_value_wins() {
        let params = query(&[("x", "10"), ("x", "20"), ("y", "5")]);
        assert_eq!(params.label_size().expect("size"), LabelSize::new(10, 5));
    }

    #[test]
    fn page_feeds_default_to_one() {
        assert_eq!(query(&[]).page_feeds().expect("pf"), 1);
        assert_eq!(query(&[("pf", "0")]).page_feeds().expect("pf"), 0);
        assert_eq!(query(&[("pf", "3")]).page_feeds().expect("pf"), 3);
    }

    #[test]
    fn bad_page_feed_is_reported() {
        let err = query(&[("pf", "two")]).page_feeds().unwrap_err();
        assert!(message(err).starts_with("Invalid PF Count: "));
        assert!(query(&[("pf", "-1")]).page_feeds().is_err());
    }

    #[test]
    fn missing_size_is_reported() {
        let err = query(&[("x", "400")]).label_size().unwrap_err();
        assert_eq!(message(err), "No Size of Label Specified");
        let err = form(&[("x", "400"), ("y", "")]).label_size().unwrap_err();
        assert_eq!(message(err), "No Size of Label Specified");
    }

    #[test]
    fn out_of_range_edges_are_rejected() {
        let err = query(&[("x", "0"), ("y", "10")]).label_size().unwrap_err();
        assert!(message(err).starts_with("Invalid width: "));
        let err = query(&[("x", "10"), ("y", "2147483648")]).label_size().unwrap_err();
        assert!(message(err).starts_with("Invalid height: "));
        let err = query(&[("x", "wide"), ("y", "10")]).label_size().unwrap_err();
        assert!(message(err).starts_with("Invalid width: "));
        assert!(query(&[("x", "2147483647"), ("y", "1")]).label_size().is_ok());
    }

    #[test]
    fn dither_name_selects_filter() {
        assert_eq!(query(&[("dither", "bayer")]).filter(), Some(Filter::Bayer3x3));
        assert_eq!(query(&[("dither", "")]).filter(), None);
        assert_eq!(query(&[]).filter(), None);
    }
}
