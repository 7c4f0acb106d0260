//! Apicalypse query construction.

use crate::request::PageRequest;

pub const SUMMARY_FIELDS: &str =
    "name,slug,first_release_date,cover.image_id,total_rating,genres.name,platforms.name";

pub const DETAIL_FIELDS: &str = "name,slug,first_release_date,cover.image_id,total_rating,genres.name,\
platforms.name,summary,url,involved_companies.company.name,involved_companies.developer,\
involved_companies.publisher,aggregated_rating";

/// Builder for an Apicalypse body.
#[derive(Debug, Default, Clone)]
pub struct Query {
    clauses: Vec<String>,
}

impl Query {
    pub fn fields(fields: &str) -> Self {
        Self {
            clauses: vec![format!("fields {};", fields)],
        }
    }

    pub fn search(mut self, text: &str) -> Self {
        self.clauses.push(format!("search \"{}\";", escape(text)));
        self
    }

    pub fn filter(mut self, condition: impl AsRef<str>) -> Self {
        self.clauses.push(format!("where {};", condition.as_ref()));
        self
    }

    pub fn sort(mut self, field: &str) -> Self {
        self.clauses.push(format!("sort {};", field));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.clauses.push(format!("limit {};", limit));
        self
    }

    pub fn page(self, page: PageRequest) -> Self {
        let offset = page.offset();
        let mut query = self.limit(page.page_size);
        query.clauses.push(format!("offset {};", offset));
        query
    }

    pub fn build(&self) -> String {
        self.clauses.join(" ")
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
