//! Crawler-facing resources, driven by the node's `allow_indexing` setting.

use crate::error::{Error, Result};
use crate::node::NodeMemory;

/// Site root as seen by crawlers.
fn site(memory: &NodeMemory) -> String {
    format!("https://{}", memory.hostname)
}

pub fn robots_txt(memory: &NodeMemory) -> String {
    let mut data = String::from("User-agent: *\n");

    if memory.allow_indexing {
        data.push_str("Allow: /\n");
        data.push_str(&format!("Sitemap: {}/sitemap.xml", site(memory)));
    } else {
        data.push_str("Disallow: /");
    }

    data
}

/// Sitemap listing the landing and submission pages with their alternate
/// language versions. `NotFound` while indexing is disabled.
pub fn sitemap_xml(memory: &NodeMemory) -> Result<String> {
    if !memory.allow_indexing {
        return Err(Error::not_found("sitemap", "sitemap.xml"));
    }

    let site = site(memory);
    let mut languages: Vec<&str> = memory
        .languages_enabled
        .iter()
        .map(String::as_str)
        .filter(|lang| *lang != memory.default_language)
        .collect();
    languages.sort_unstable();

    let mut data = String::from(
        "<?xml version='1.0' encoding='UTF-8' ?>\n\
         <urlset xmlns='http://www.sitemaps.org/schemas/sitemap/0.9' xmlns:xhtml='http://www.w3.org/1999/xhtml'>\n",
    );

    for url in ["/#/", "/#/submission"] {
        data.push_str("  <url>\n");
        data.push_str(&format!("    <loc>{}{}</loc>\n", site, url));
        data.push_str("    <changefreq>weekly</changefreq>\n");
        data.push_str("    <priority>1.00</priority>\n");

        for lang in &languages {
            let hreflang = lang.to_lowercase().replace('_', "-");
            data.push_str(&format!(
                "<xhtml:link rel='alternate' hreflang='{}' href='{}/#/?lang={}' />\n",
                hreflang, site, lang
            ));
        }

        data.push_str("  </url>\n");
    }

    data.push_str("</urlset>");
    Ok(data)
}
