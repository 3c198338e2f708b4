use std::collections::HashSet;

use scraper::node::Comment;
use scraper::{Html, Node, Selector};
use tracing::debug;

use crate::filter::{ContentTransform, TransformError};
use crate::synthetic::SERVER_NAME;

const PLACEHOLDER: &str = " An advertisement here was removed ";

/// Replaces every element matching a selector with a placeholder comment, and notes the number
/// of removed elements in a comment at the end of the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementRemover;

impl ContentTransform for ElementRemover {
    fn transform(&self, content: &[u8], selectors: &[Selector]) -> Result<Vec<u8>, TransformError> {
        let source = std::str::from_utf8(content)?;
        let mut document = Html::parse_document(source);

        let mut seen = HashSet::new();
        let matched = selectors
            .iter()
            .flat_map(|selector| document.select(selector).map(|element| element.id()).collect::<Vec<_>>())
            .filter(|id| seen.insert(*id))
            .collect::<Vec<_>>();

        for id in &matched {
            if let Some(mut node) = document.tree.get_mut(*id) {
                node.insert_before(comment(PLACEHOLDER));
                node.detach();
            }
        }

        let summary =
            comment(&format!(" This page was reassembled by {SERVER_NAME}. {} advertisement elements were removed. ", matched.len()));
        let html_element = document.tree.root().children().find(|node| node.value().is_element()).map(|node| node.id());
        match html_element.and_then(|id| document.tree.get_mut(id)) {
            Some(mut html) => {
                html.append(summary);
            }
            None => {
                document.tree.root_mut().append(summary);
            }
        }

        debug!(removed = matched.len(), "rewrote page");
        Ok(document.html().into_bytes())
    }
}

fn comment(text: &str) -> Node {
    Node::Comment(Comment { comment: text.into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn selectors(selectors: &[&str]) -> Vec<Selector> {
        selectors.iter().map(|selector| Selector::parse(selector).unwrap()).collect()
    }

    fn remove(page: &str, selector_list: &[&str]) -> String {
        let output = ElementRemover.transform(page.as_bytes(), &selectors(selector_list)).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn replaces_matching_elements() {
        let page = indoc! {r#"
            <!DOCTYPE html>
            <html>
            <head><title>News</title></head>
            <body>
            <div class="ad">buy now</div>
            <p>story</p>
            <iframe src="http://ads.example.com/"></iframe>
            </body>
            </html>
        "#};

        let output = remove(page, &["div.ad", "iframe"]);

        assert!(!output.contains("buy now"));
        assert!(!output.contains("<iframe"));
        assert!(output.contains("<p>story</p>"));
        assert_eq!(output.matches("<!-- An advertisement here was removed -->").count(), 2);
        assert!(output.contains("<!-- This page was reassembled by micro-proxy. 2 advertisement elements were removed. --></html>"));
    }

    #[test]
    fn counts_each_element_once() {
        let output = remove("<html><body><div class=\"ad banner\">x</div></body></html>", &[".ad", ".banner", "div"]);

        assert_eq!(output.matches("An advertisement here was removed").count(), 1);
        assert!(output.contains("1 advertisement elements were removed"));
    }

    #[test]
    fn nothing_matches() {
        let output = remove("<html><body><p>clean</p></body></html>", &["div.ad"]);

        assert!(output.contains("<p>clean</p>"));
        assert!(output.contains("0 advertisement elements were removed"));
    }

    #[test]
    fn removing_the_root_element() {
        let output = remove("<html><body>x</body></html>", &["html"]);

        assert!(!output.contains("<body>"));
        assert!(output.ends_with("<!-- This page was reassembled by micro-proxy. 1 advertisement elements were removed. -->"));
    }

    #[test]
    fn reject_non_utf8() {
        let result = ElementRemover.transform(&[0x3c, 0xff, 0xfe, 0x3e], &selectors(&["div"]));
        assert!(matches!(result, Err(TransformError::NotUtf8 { .. })));
    }
}
