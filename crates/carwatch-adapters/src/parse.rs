use carwatch_core::{extract_year, ScrapedListing};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::rules::ClassifierRules;
use crate::AdapterError;

const ROW_SELECTOR: &str = r#"tr[align="center"][valign="middle"]"#;
const TITLE_SELECTOR: &str = "span.Tahoma15blacknound";
const LINK_SELECTOR: &str = "a[href^='/UDTransDetail']";
const MILEAGE_SELECTOR: &str = "span.Tahoma14DbluenoUnd";
const PRICE_SELECTOR: &str = "span.Tahoma14BrownNound";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub listings: Vec<ScrapedListing>,
    pub off_topic: usize,
}

struct RowSelectors {
    row: Selector,
    title: Selector,
    link: Selector,
    mileage: Selector,
    price: Selector,
}

impl RowSelectors {
    fn compile() -> Result<Self, AdapterError> {
        Ok(Self {
            row: selector(ROW_SELECTOR)?,
            title: selector(TITLE_SELECTOR)?,
            link: selector(LINK_SELECTOR)?,
            mileage: selector(MILEAGE_SELECTOR)?,
            price: selector(PRICE_SELECTOR)?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Message(format!("invalid selector {css}: {e}")))
}

fn first_text(row: &ElementRef<'_>, sel: &Selector) -> String {
    row.select(sel)
        .next()
        .map(|n| n.text().collect::<String>().replace('\u{a0}', " ").trim().to_string())
        .unwrap_or_default()
}

/// Rows missing a detail link are still returned (with an empty `link`) so the
/// reconciler can count them as parse failures.
#[derive(Debug, Clone)]
pub struct ResultPageParser {
    base_url: String,
    rules: ClassifierRules,
    today: NaiveDate,
}

impl ResultPageParser {
    pub fn new(base_url: impl Into<String>, rules: ClassifierRules, today: NaiveDate) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rules,
            today,
        }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    pub fn parse(&self, html: &str) -> Result<ParsedPage, AdapterError> {
        let selectors = RowSelectors::compile()?;
        let document = Html::parse_document(html);
        let mut page = ParsedPage::default();

        for row in document.select(&selectors.row) {
            let title = first_text(&row, &selectors.title);
            if !self.rules.matches_search_term(&title) {
                page.off_topic += 1;
                continue;
            }

            let link = row
                .select(&selectors.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| self.absolute_link(href.trim()))
                .unwrap_or_default();
            let mileage = first_text(&row, &selectors.mileage)
                .replace("Millas", "")
                .trim()
                .to_string();
            let price = first_text(&row, &selectors.price);

            page.listings.push(ScrapedListing {
                is_hybrid: self.rules.is_hybrid(&title),
                year: extract_year(&title, self.today),
                title,
                link,
                mileage,
                price,
            });
        }

        Ok(page)
    }

    fn absolute_link(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}
