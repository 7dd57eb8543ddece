//! Runtime routing table and compiled-asset exclusions
//!
//! Both are declarative: the caching engine evaluates them, this module only
//! builds and validates them.

use crate::error::{PwaError, PwaResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};

const DAY: u64 = 24 * 60 * 60;

/// Which requests a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlMatcher {
    /// Case-insensitive regex against the full URL
    Regex(String),
    /// Exact same-origin path
    Path(String),
    /// Same-origin paths under `prefix`, minus any `except` prefixes
    SameOrigin {
        prefix: String,
        #[serde(default)]
        except: Vec<String>,
    },
    /// Any URL on another origin
    CrossOrigin,
}

impl UrlMatcher {
    pub fn regex(pattern: &str) -> Self {
        Self::Regex(pattern.to_string())
    }

    /// Whether an absolute URL matches, given the page origin
    pub fn matches(&self, url: &str, origin: &str) -> bool {
        let same_origin_path = url.strip_prefix(origin).filter(|rest| rest.starts_with('/'));
        match self {
            Self::Regex(pattern) => Regex::new(&format!("(?i){}", pattern))
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Path(path) => same_origin_path
                .map(|p| crate::runtime::http::strip_search(p) == path)
                .unwrap_or(false),
            Self::SameOrigin { prefix, except } => same_origin_path
                .map(|p| p.starts_with(prefix.as_str()) && !except.iter().any(|e| p.starts_with(e.as_str())))
                .unwrap_or(false),
            Self::CrossOrigin => same_origin_path.is_none(),
        }
    }
}

/// Caching strategies provided by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    CacheFirst,
    CacheOnly,
    NetworkFirst,
    NetworkOnly,
    StaleWhileRevalidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiration {
    pub max_entries: u32,
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub cache_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_timeout_seconds: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub range_requests: bool,
}

/// Hooks attached to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePlugin {
    /// Store opaque redirects as plain 200 responses
    RedirectToOk,
    /// Serve the offline fallback when the strategy fails
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub url_pattern: UrlMatcher,
    pub handler: Strategy,
    #[serde(default)]
    pub options: RouteOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<RoutePlugin>,
}

impl RouteRule {
    pub fn new(url_pattern: UrlMatcher, handler: Strategy, cache_name: &str) -> Self {
        Self {
            url_pattern,
            handler,
            options: RouteOptions {
                cache_name: Some(cache_name.to_string()),
                ..RouteOptions::default()
            },
            plugins: vec![],
        }
    }

    pub fn expire(mut self, max_entries: u32, max_age_seconds: u64) -> Self {
        self.options.expiration = Some(Expiration {
            max_entries,
            max_age_seconds,
        });
        self
    }

    pub fn timeout(mut self, seconds: u32) -> Self {
        self.options.network_timeout_seconds = Some(seconds);
        self
    }

    pub fn range_requests(mut self) -> Self {
        self.options.range_requests = true;
        self
    }

    /// Reject rules the engine could not evaluate
    pub fn validate(&self) -> PwaResult<()> {
        if let UrlMatcher::Regex(pattern) = &self.url_pattern {
            Regex::new(pattern).map_err(|e| PwaError::User(format!(
                "Invalid runtime caching pattern {}: {}",
                pattern, e
            )))?;
        }
        if let Some(expiration) = &self.options.expiration {
            if expiration.max_entries == 0 {
                return Err(PwaError::User(format!(
                    "Runtime caching rule {:?} has max_entries = 0",
                    self.options.cache_name
                )));
            }
        }
        Ok(())
    }
}

/// Default routing table
pub fn default_runtime_caching() -> Vec<RouteRule> {
    use Strategy::*;

    vec![
        RouteRule::new(UrlMatcher::regex(r"^https://fonts\.(?:gstatic)\.com/.*"), CacheFirst, "google-fonts-webfonts")
            .expire(4, 365 * DAY),
        RouteRule::new(UrlMatcher::regex(r"^https://fonts\.(?:googleapis)\.com/.*"), StaleWhileRevalidate, "google-fonts-stylesheets")
            .expire(4, 7 * DAY),
        RouteRule::new(UrlMatcher::regex(r"\.(?:eot|otf|ttc|ttf|woff|woff2|font\.css)$"), StaleWhileRevalidate, "static-font-assets")
            .expire(4, 7 * DAY),
        RouteRule::new(UrlMatcher::regex(r"\.(?:jpg|jpeg|gif|png|svg|ico|webp)$"), StaleWhileRevalidate, "static-image-assets")
            .expire(64, DAY),
        RouteRule::new(UrlMatcher::regex(r"/_next/image\?url=.+$"), StaleWhileRevalidate, "next-image")
            .expire(64, DAY),
        RouteRule::new(UrlMatcher::regex(r"\.(?:mp3|wav|ogg)$"), CacheFirst, "static-audio-assets")
            .expire(32, DAY)
            .range_requests(),
        RouteRule::new(UrlMatcher::regex(r"\.(?:mp4)$"), CacheFirst, "static-video-assets")
            .expire(32, DAY)
            .range_requests(),
        RouteRule::new(UrlMatcher::regex(r"\.(?:js)$"), StaleWhileRevalidate, "static-js-assets")
            .expire(32, DAY),
        RouteRule::new(UrlMatcher::regex(r"\.(?:css|less)$"), StaleWhileRevalidate, "static-style-assets")
            .expire(32, DAY),
        RouteRule::new(UrlMatcher::regex(r"/_next/data/.+/.+\.json$"), StaleWhileRevalidate, "next-data")
            .expire(32, DAY),
        RouteRule::new(UrlMatcher::regex(r"\.(?:json|xml|csv)$"), NetworkFirst, "static-data-assets")
            .expire(32, DAY),
        RouteRule::new(
            UrlMatcher::SameOrigin { prefix: "/api/".into(), except: vec!["/api/auth/".into()] },
            NetworkFirst,
            "apis",
        )
        .expire(16, DAY)
        .timeout(10),
        RouteRule::new(
            UrlMatcher::SameOrigin { prefix: "/".into(), except: vec!["/api/".into()] },
            NetworkFirst,
            "others",
        )
        .expire(32, DAY)
        .timeout(10),
        RouteRule::new(UrlMatcher::CrossOrigin, NetworkFirst, "cross-origin")
            .expire(32, 60 * 60)
            .timeout(10),
    ]
}

/// Development table: everything from the network
pub fn dev_runtime_caching() -> Vec<RouteRule> {
    vec![RouteRule::new(UrlMatcher::regex(".*"), Strategy::NetworkOnly, "dev")]
}

/// Network-first rule for a dynamic start URL
pub fn start_url_rule(base_path: &str) -> RouteRule {
    let mut rule = RouteRule::new(
        UrlMatcher::Path(base_path.to_string()),
        Strategy::NetworkFirst,
        "start-url",
    );
    rule.plugins.push(RoutePlugin::RedirectToOk);
    rule
}

/// Give every rule the offline fallback hook
pub fn attach_fallback_plugin(rules: &mut [RouteRule]) {
    for rule in rules {
        if !rule.plugins.contains(&RoutePlugin::Fallback) {
            rule.plugins.push(RoutePlugin::Fallback);
        }
    }
}

/// Exclusion predicate for compiled build assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExcludeRule {
    Glob { pattern: String },
    Prefix { prefix: String },
    Name { names: Vec<String> },
    /// Development builds only precache the runtime chunks
    DevNonRuntime,
    /// Modern builds drop legacy `.js` bundles
    ModernLegacyJs,
}

impl ExcludeRule {
    /// Evaluate every rule except `Glob`, which needs [`AssetFilter`]
    fn matches_simple(&self, name: &str) -> bool {
        match self {
            Self::Glob { .. } => false,
            Self::Prefix { prefix } => name.starts_with(prefix.as_str()),
            Self::Name { names } => names.iter().any(|n| n == name),
            Self::DevNonRuntime => !name.starts_with("static/runtime/"),
            Self::ModernLegacyJs => name.ends_with(".js") && !name.ends_with(".module.js"),
        }
    }
}

/// Exclusion rules for one build
pub fn exclude_rules(build_excludes: &[String], dev: bool, modern: bool) -> Vec<ExcludeRule> {
    let mut rules: Vec<ExcludeRule> = build_excludes
        .iter()
        .map(|pattern| ExcludeRule::Glob {
            pattern: pattern.clone(),
        })
        .collect();
    rules.push(ExcludeRule::Prefix {
        prefix: "server/".to_string(),
    });
    rules.push(ExcludeRule::Name {
        names: vec![
            "build-manifest.json".to_string(),
            "react-loadable-manifest.json".to_string(),
        ],
    });
    if dev {
        rules.push(ExcludeRule::DevNonRuntime);
    }
    if modern {
        rules.push(ExcludeRule::ModernLegacyJs);
    }
    rules
}

/// Compiled form of a rule set
#[derive(Debug)]
pub struct AssetFilter {
    rules: Vec<ExcludeRule>,
    globs: GlobSet,
}

impl AssetFilter {
    pub fn new(rules: Vec<ExcludeRule>) -> PwaResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for rule in &rules {
            if let ExcludeRule::Glob { pattern } = rule {
                let glob = Glob::new(pattern).map_err(|e| PwaError::ExcludePattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                builder.add(glob);
            }
        }
        let globs = builder.build().map_err(|e| PwaError::ExcludePattern {
            pattern: "build_excludes".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { rules, globs })
    }

    pub fn rules(&self) -> &[ExcludeRule] {
        &self.rules
    }

    /// Whether a compiled asset name is kept out of the manifest
    pub fn is_excluded(&self, name: &str) -> bool {
        self.globs.is_match(name) || self.rules.iter().any(|r| r.matches_simple(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://app.test";

    #[test]
    fn default_table_is_valid() {
        let rules = default_runtime_caching();
        assert_eq!(rules.len(), 14);
        for rule in &rules {
            rule.validate().unwrap();
            assert!(rule.options.cache_name.is_some());
        }
    }

    #[test]
    fn matcher_regex_is_case_insensitive() {
        let images = UrlMatcher::regex(r"\.(?:jpg|jpeg|gif|png|svg|ico|webp)$");
        assert!(images.matches("https://app.test/logo.PNG", ORIGIN));
        assert!(!images.matches("https://app.test/logo.png.txt", ORIGIN));
    }

    #[test]
    fn matcher_same_origin_except() {
        let apis = UrlMatcher::SameOrigin {
            prefix: "/api/".into(),
            except: vec!["/api/auth/".into()],
        };
        assert!(apis.matches("https://app.test/api/posts", ORIGIN));
        assert!(!apis.matches("https://app.test/api/auth/session", ORIGIN));
        assert!(!apis.matches("https://other.test/api/posts", ORIGIN));
        assert!(UrlMatcher::CrossOrigin.matches("https://other.test/api/posts", ORIGIN));
        assert!(UrlMatcher::CrossOrigin.matches("https://app.test.evil/x", ORIGIN));
    }

    #[test]
    fn start_url_rule_matches_base_path_only() {
        let rule = start_url_rule("/");
        assert!(rule.url_pattern.matches("https://app.test/", ORIGIN));
        assert!(rule.url_pattern.matches("https://app.test/?utm=1", ORIGIN));
        assert!(!rule.url_pattern.matches("https://app.test/about", ORIGIN));
        assert_eq!(rule.plugins, vec![RoutePlugin::RedirectToOk]);
        assert_eq!(rule.options.cache_name.as_deref(), Some("start-url"));
    }

    #[test]
    fn fallback_plugin_added_once() {
        let mut rules = dev_runtime_caching();
        attach_fallback_plugin(&mut rules);
        attach_fallback_plugin(&mut rules);
        assert_eq!(rules[0].plugins, vec![RoutePlugin::Fallback]);
    }

    #[test]
    fn invalid_regex_rejected() {
        let rule = RouteRule::new(UrlMatcher::regex("(unclosed"), Strategy::CacheFirst, "x");
        assert!(rule.validate().is_err());
    }

    #[test]
    fn rule_parses_from_toml() {
        let toml = r#"
            url_pattern = { regex = "\\.pdf$" }
            handler = "CacheFirst"
            [options]
            cache_name = "pdfs"
            expiration = { max_entries = 8, max_age_seconds = 3600 }
        "#;
        let rule: RouteRule = toml::from_str(toml).unwrap();
        assert_eq!(rule.handler, Strategy::CacheFirst);
        assert_eq!(rule.url_pattern, UrlMatcher::regex(r"\.pdf$"));
        assert_eq!(rule.options.expiration.unwrap().max_entries, 8);
        assert!(rule.plugins.is_empty());
    }

    #[test]
    fn build_asset_exclusions() {
        let filter = AssetFilter::new(exclude_rules(&["**/*.map".to_string()], false, false)).unwrap();
        assert!(filter.is_excluded("server/pages/index.js"));
        assert!(filter.is_excluded("build-manifest.json"));
        assert!(filter.is_excluded("static/chunks/main.js.map"));
        assert!(!filter.is_excluded("static/chunks/main.js"));
        assert!(!filter.is_excluded("static/build-manifest.json"));
    }

    #[test]
    fn dev_keeps_only_runtime() {
        let filter = AssetFilter::new(exclude_rules(&[], true, false)).unwrap();
        assert!(filter.is_excluded("static/chunks/main.js"));
        assert!(!filter.is_excluded("static/runtime/webpack.js"));
    }

    #[test]
    fn modern_drops_legacy_js() {
        let filter = AssetFilter::new(exclude_rules(&[], false, true)).unwrap();
        assert!(filter.is_excluded("static/chunks/main.js"));
        assert!(!filter.is_excluded("static/chunks/main.module.js"));
        assert!(!filter.is_excluded("static/css/app.css"));
    }
}
