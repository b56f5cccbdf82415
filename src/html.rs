//! arXiv search-result extraction built on `scraper`.

use scraper::{ElementRef, Html, Selector};

/// A title/link pair pulled from one `li.arxiv-result` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    /// Title text with whitespace collapsed.
    pub title: String,
    /// `href` of the first anchor in the entry's list-title line.
    pub link: String,
}

/// Parses arXiv search-result markup.
///
/// Selectors are compiled once; reuse the extractor across pages.
pub struct ResultExtractor {
    selectors: ResultSelectors,
}

impl ResultExtractor {
    /// Builds an extractor for the current arXiv result layout.
    pub fn new() -> Self {
        Self {
            selectors: ResultSelectors::new(),
        }
    }

    /// Extracts every complete result item from `html`, in document order.
    ///
    /// Entries missing a title or a link are dropped rather than emitted partially.
    pub fn extract(&self, html: &str) -> Vec<ResultItem> {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors.item)
            .filter_map(|item| self.extract_item(item))
            .collect()
    }

    fn extract_item(&self, item: ElementRef<'_>) -> Option<ResultItem> {
        let title = item
            .select(&self.selectors.title)
            .next()
            .map(collapsed_text)
            .filter(|text| !text.is_empty())?;
        let link = item
            .select(&self.selectors.list_title)
            .next()?
            .select(&self.selectors.anchor)
            .next()?
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())?
            .to_string();
        Some(ResultItem { title, link })
    }
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct ResultSelectors {
    item: Selector,
    title: Selector,
    list_title: Selector,
    anchor: Selector,
}

impl ResultSelectors {
    fn new() -> Self {
        Self {
            item: Selector::parse("li.arxiv-result").expect("result item selector"),
            title: Selector::parse("p.title").expect("title selector"),
            list_title: Selector::parse("p.list-title").expect("list-title selector"),
            anchor: Selector::parse("a").expect("anchor selector"),
        }
    }
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for piece in element.text() {
        for word in piece.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><ol class="breathe-horizontal">
          <li class="arxiv-result">
            <div class="is-marginless">
              <p class="list-title is-inline-block">
                <a href="https://arxiv.org/abs/2401.00001">arXiv:2401.00001</a>
                <span>&nbsp;[<a href="https://arxiv.org/pdf/2401.00001">pdf</a>]</span>
              </p>
            </div>
            <p class="title is-5 mathjax">
              Attention Is
              All You <span class="search-hit">Need</span>
            </p>
          </li>
          <li class="arxiv-result">
            <p class="list-title"><a href="https://arxiv.org/abs/2401.00002">arXiv:2401.00002</a></p>
          </li>
          <li class="arxiv-result">
            <p class="list-title">no anchor here</p>
            <p class="title">Orphan Title</p>
          </li>
          <li class="arxiv-result">
            <p class="list-title"><a href="https://arxiv.org/abs/2401.00004">arXiv:2401.00004</a></p>
            <p class="title">Graph &amp; Sequence Models</p>
          </li>
        </ol></body></html>
    "#;

    #[test]
    fn extracts_complete_items_in_order() {
        let items = ResultExtractor::new().extract(PAGE);
        assert_eq!(
            items,
            vec![
                ResultItem {
                    title: "Attention Is All You Need".to_string(),
                    link: "https://arxiv.org/abs/2401.00001".to_string(),
                },
                ResultItem {
                    title: "Graph & Sequence Models".to_string(),
                    link: "https://arxiv.org/abs/2401.00004".to_string(),
                },
            ]
        );
    }

    #[test]
    fn empty_results_page_yields_nothing() {
        let html = r#"<html><body><p class="is-size-4">Sorry, your query returned no results</p></body></html>"#;
        assert!(ResultExtractor::new().extract(html).is_empty());
    }

    #[test]
    fn blank_title_or_href_is_dropped() {
        let html = r#"
            <li class="arxiv-result">
              <p class="list-title"><a href="  ">arXiv</a></p>
              <p class="title">Has Title</p>
            </li>
            <li class="arxiv-result">
              <p class="list-title"><a href="https://arxiv.org/abs/9">arXiv</a></p>
              <p class="title">   </p>
            </li>
        "#;
        assert!(ResultExtractor::new().extract(html).is_empty());
    }
}
