use once_cell::sync::Lazy;
use regex::Regex;

static RE_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<article(?:\s[^>]*)?>(.*?)</article\s*>").unwrap());
static RE_SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap());
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Text of the first `<article>` element, or `None` when there is no article
/// or it holds no text.
pub fn extract_article_text(html: &str) -> Option<String> {
    let body = RE_ARTICLE.captures(html)?.get(1)?.as_str();

    let without_code = RE_SCRIPT_STYLE.replace_all(body, " ");
    let without_tags = RE_TAGS.replace_all(&without_code, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    let text = RE_WS.replace_all(&decoded, " ").trim().to_string();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Join the feed's base URL and a story path without doubling or dropping the slash.
pub fn resolve_story_url(base: &str, story_path: &str) -> String {
    if story_path.starts_with("http://") || story_path.starts_with("https://") {
        return story_path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        story_path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    mod extract_article_text_tests {
        use super::*;

        #[test]
        fn test_extract_simple_article() {
            let html = "<html><body><article><p>Stocks rallied.</p></article></body></html>";
            assert_eq!(extract_article_text(html), Some("Stocks rallied.".to_string()));
        }

        #[test]
        fn test_article_with_attributes() {
            let html = r#"<article class="story" data-id="7"><h1>Title</h1><p>Body</p></article>"#;
            assert_eq!(extract_article_text(html), Some("Title Body".to_string()));
        }

        #[test]
        fn test_no_article_element() {
            let html = "<html><body><div>Just a div</div></body></html>";
            assert_eq!(extract_article_text(html), None);
        }

        #[test]
        fn test_empty_article() {
            assert_eq!(extract_article_text("<article>  <div></div>\n</article>"), None);
        }

        #[test]
        fn test_unclosed_article() {
            assert_eq!(extract_article_text("<article><p>Cut off"), None);
        }

        #[test]
        fn test_does_not_match_similar_tag_names() {
            let html = "<articles><p>not it</p></articles>";
            assert_eq!(extract_article_text(html), None);
        }

        #[test]
        fn test_first_article_wins() {
            let html = "<article>first</article><article>second</article>";
            assert_eq!(extract_article_text(html), Some("first".to_string()));
        }

        #[test]
        fn test_scripts_and_styles_dropped() {
            let html = r#"
                <article>
                    <style>.x { color: red }</style>
                    <p>Earnings up</p>
                    <script type="text/javascript">track("view");</script>
                </article>
            "#;
            assert_eq!(extract_article_text(html), Some("Earnings up".to_string()));
        }

        #[test]
        fn test_entities_decoded_and_whitespace_collapsed() {
            let html = "<article>\n  <p>S&amp;P  500\n\n hits &quot;record&quot;</p>\n</article>";
            assert_eq!(
                extract_article_text(html),
                Some("S&P 500 hits \"record\"".to_string())
            );
        }

        #[test]
        fn test_case_insensitive_tag() {
            let html = "<ARTICLE><P>Loud</P></ARTICLE>";
            assert_eq!(extract_article_text(html), Some("Loud".to_string()));
        }
    }

    mod resolve_story_url_tests {
        use super::*;

        #[test]
        fn test_plain_join() {
            assert_eq!(
                resolve_story_url("https://example.com", "/news/abc"),
                "https://example.com/news/abc"
            );
        }

        #[test]
        fn test_trailing_slash_on_base() {
            assert_eq!(
                resolve_story_url("https://example.com/", "/news/abc"),
                "https://example.com/news/abc"
            );
        }

        #[test]
        fn test_path_without_leading_slash() {
            assert_eq!(
                resolve_story_url("https://example.com", "news/abc"),
                "https://example.com/news/abc"
            );
        }

        #[test]
        fn test_absolute_story_url_kept() {
            assert_eq!(
                resolve_story_url("https://example.com", "https://other.com/x"),
                "https://other.com/x"
            );
        }
    }
}
