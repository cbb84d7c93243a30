// Host stripping: absolute URLs pointing back at the origin become relative

use regex::{Captures, Regex};

/// Placeholder host the origin uses when no real hostname is known
const DEFAULT_HOST: &str = "default";

/// Rewrites `scheme://host[:port]` prefixes of the configured hosts (and
/// `http://default`) to relative paths, in plain and JSON-escaped form.
///
/// Markup is left alone when no host is configured; redirect locations on
/// `default` are always collapsed.
#[derive(Debug, Clone)]
pub struct HostRewriter {
    absolute: Regex,
    location: Regex,
    hosts: Vec<String>,
    strip_markup: bool,
}

impl HostRewriter {
    pub fn new<I, S>(hosts: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        let strip_markup = !hosts.is_empty();
        if !hosts.iter().any(|h| h == DEFAULT_HOST) {
            hosts.push(DEFAULT_HOST.to_string());
        }

        let alternatives = hosts
            .iter()
            .map(|h| {
                if h.contains(':') {
                    regex::escape(h)
                } else {
                    format!(r"{}(?::\d+)?", regex::escape(h))
                }
            })
            .collect::<Vec<_>>()
            .join("|");

        // `(?:\\?/){2}` covers both `//` and the JSON-escaped `\/\/`.
        // `tail` keeps `example.com` from matching `example.company.com`.
        let absolute = Regex::new(&format!(
            r"(?i)(?:https?:)?(?:\\?/){{2}}(?:{})(?P<tail>\\?/|[^\w.\-]|$)",
            alternatives
        ))?;
        let location = Regex::new(r"^(?i)(?:https?:)?//(?P<host>[^/?#]+)(?P<rest>.*)$")?;

        Ok(Self {
            absolute,
            location,
            hosts,
            strip_markup,
        })
    }

    /// Strip configured hosts anywhere in `markup`
    pub fn rewrite(&self, markup: &str) -> String {
        if !self.strip_markup {
            return markup.to_string();
        }
        self.absolute
            .replace_all(markup, |caps: &Captures| {
                let tail = &caps["tail"];
                if tail.ends_with('/') {
                    tail.to_string()
                } else {
                    format!("/{}", tail)
                }
            })
            .into_owned()
    }

    /// Canonicalize a redirect `Location`: relative paths pass through,
    /// absolute URLs on a configured host lose scheme and host, foreign
    /// URLs stay absolute.
    pub fn canonicalize_location(&self, location: &str) -> String {
        let location = location.trim();
        let caps = match self.location.captures(location) {
            Some(caps) => caps,
            None => return location.to_string(),
        };

        let host = caps["host"].to_ascii_lowercase();
        if !self.is_stripped_host(&host) {
            return location.to_string();
        }

        let rest = &caps["rest"];
        if rest.is_empty() {
            "/".to_string()
        } else if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{}", rest)
        }
    }

    fn is_stripped_host(&self, host: &str) -> bool {
        let bare = host.split(':').next().unwrap_or(host);
        self.hosts
            .iter()
            .any(|h| h == host || (!h.contains(':') && h == bare))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> HostRewriter {
        HostRewriter::new(["example.com", "cms.example.com:8080"]).unwrap()
    }

    #[test]
    fn test_rewrite_plain_urls() {
        let r = rewriter();
        assert_eq!(
            r.rewrite(r#"<a href="https://example.com/about">x</a>"#),
            r#"<a href="/about">x</a>"#
        );
        assert_eq!(
            r.rewrite(r#"<img src="http://cms.example.com:8080/img.png">"#),
            r#"<img src="/img.png">"#
        );
        assert_eq!(r.rewrite(r#"<a href="//example.com">"#), r#"<a href="/">"#);
        assert_eq!(r.rewrite("http://default/node/1"), "/node/1");
    }

    #[test]
    fn test_rewrite_json_escaped_urls() {
        let r = rewriter();
        assert_eq!(
            r.rewrite(r#"{"url":"https:\/\/example.com\/about"}"#),
            r#"{"url":"\/about"}"#
        );
    }

    #[test]
    fn test_foreign_hosts_untouched() {
        let r = rewriter();
        let markup = r#"<a href="https://other.org/page">"#;
        assert_eq!(r.rewrite(markup), markup);
        let markup = r#"<a href="https://example.company.com/">"#;
        assert_eq!(r.rewrite(markup), markup);
    }

    #[test]
    fn test_markup_untouched_without_hosts() {
        let r = HostRewriter::new(Vec::<String>::new()).unwrap();
        let markup = r#"<a href="http://default/node/1">"#;
        assert_eq!(r.rewrite(markup), markup);
        assert_eq!(r.canonicalize_location("http://default/x"), "/x");
        assert_eq!(
            r.canonicalize_location("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_canonicalize_location() {
        let r = rewriter();
        assert_eq!(r.canonicalize_location("/new"), "/new");
        assert_eq!(r.canonicalize_location("https://example.com/new?x=1"), "/new?x=1");
        assert_eq!(r.canonicalize_location("http://example.com:443"), "/");
        assert_eq!(r.canonicalize_location("http://default/node/2"), "/node/2");
        assert_eq!(
            r.canonicalize_location("https://other.org/x"),
            "https://other.org/x"
        );
        assert_eq!(
            r.canonicalize_location("http://cms.example.com:9090/x"),
            "http://cms.example.com:9090/x"
        );
    }
}
