#![forbid(unsafe_code)]

//! Replacing the content of a host element with a view.

use wecco_dom::Node;
use wecco_html::{ElementUpdate, Engine, RenderError, update_element};

/// Show `view` as the whole content of `host`.
///
/// Updaters (templates) manage the content themselves and patch a previous
/// rendering; everything else replaces the current children.
pub(crate) fn show(host: &Node, view: ElementUpdate) -> Result<(), RenderError> {
    if !view.is_updater() {
        Engine::for_document(&host.document()).forget(host);
        host.remove_all_children()?;
    }
    update_element(host, view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wecco_dom::Document;
    use wecco_html::html;

    #[test]
    fn markup_replaces_content() {
        let doc = Document::new();
        let body = doc.body();
        show(&body, ElementUpdate::from("<p>one</p>")).unwrap();
        show(&body, ElementUpdate::from("<p>two</p>")).unwrap();
        assert_eq!(body.inner_html(), "<p>two</p>");
    }

    #[test]
    fn templates_patch() {
        let doc = Document::new();
        let body = doc.body();
        show(&body, html!("<p>" {1} "</p>").into()).unwrap();
        let p = body.first_child().unwrap();
        show(&body, html!("<p>" {2} "</p>").into()).unwrap();
        assert_eq!(body.first_child().unwrap(), p);
        assert_eq!(p.text_content(), "2");
    }

    #[test]
    fn switching_from_template_to_markup_drops_the_record() {
        let doc = Document::new();
        let body = doc.body();
        show(&body, html!("<p>" {1} "</p>").into()).unwrap();
        show(&body, ElementUpdate::from("<hr>")).unwrap();
        assert!(!Engine::for_document(&doc).has_record(&body));
        assert_eq!(body.inner_html(), "<hr>");
    }
}
