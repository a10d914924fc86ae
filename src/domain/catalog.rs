//! Static tool definitions for every module
//!
//! Each tool maps one-to-one onto a live DataForSEO endpoint; its arguments are sent
//! as the single task in the request array.

use crate::domain::modules::ModuleKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub module: ModuleKind,
    pub description: &'static str,
    pub endpoint: &'static str,
    pub params: &'static [ParamSpec],
}

const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
        description,
    }
}

const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
        description,
    }
}

const LOCATION_NAME: ParamSpec = optional(
    "location_name",
    ParamKind::String,
    "full name of the location, e.g. \"United States\"",
);
const LOCATION_CODE: ParamSpec = optional(
    "location_code",
    ParamKind::Integer,
    "location code, e.g. 2840 for the United States",
);
const LANGUAGE_CODE: ParamSpec = optional(
    "language_code",
    ParamKind::String,
    "language code, e.g. \"en\"",
);
const LIMIT: ParamSpec = optional(
    "limit",
    ParamKind::Integer,
    "maximum number of returned items",
);
const TARGET_DOMAIN: ParamSpec = required(
    "target",
    ParamKind::String,
    "target domain without https:// and www.",
);

pub const TOOLS: &[ToolDefinition] = &[
    ToolDefinition {
        name: "serp_organic_live_advanced",
        module: ModuleKind::Serp,
        description: "Get Google organic search results for a keyword",
        endpoint: "/v3/serp/google/organic/live/advanced",
        params: &[
            required("keyword", ParamKind::String, "search query"),
            LOCATION_NAME,
            LOCATION_CODE,
            LANGUAGE_CODE,
            optional("depth", ParamKind::Integer, "number of results to parse"),
            optional("device", ParamKind::String, "desktop or mobile"),
        ],
    },
    ToolDefinition {
        name: "serp_youtube_organic_live_advanced",
        module: ModuleKind::Serp,
        description: "Get YouTube organic search results for a keyword",
        endpoint: "/v3/serp/youtube/organic/live/advanced",
        params: &[
            required("keyword", ParamKind::String, "search query"),
            LOCATION_CODE,
            LANGUAGE_CODE,
            optional("block_depth", ParamKind::Integer, "number of blocks to parse"),
        ],
    },
    ToolDefinition {
        name: "keywords_data_google_ads_search_volume",
        module: ModuleKind::KeywordsData,
        description: "Get Google Ads search volume, CPC and competition for keywords",
        endpoint: "/v3/keywords_data/google_ads/search_volume/live",
        params: &[
            required("keywords", ParamKind::StringArray, "keywords to look up"),
            LOCATION_NAME,
            LOCATION_CODE,
            LANGUAGE_CODE,
        ],
    },
    ToolDefinition {
        name: "keywords_data_google_trends_explore",
        module: ModuleKind::KeywordsData,
        description: "Get Google Trends popularity data for up to five keywords",
        endpoint: "/v3/keywords_data/google_trends/explore/live",
        params: &[
            required("keywords", ParamKind::StringArray, "keywords to compare"),
            LOCATION_CODE,
            LANGUAGE_CODE,
            optional("time_range", ParamKind::String, "e.g. past_12_months"),
        ],
    },
    ToolDefinition {
        name: "on_page_instant_pages",
        module: ModuleKind::OnPage,
        description: "Crawl a single page and return its on-page SEO checks",
        endpoint: "/v3/on_page/instant_pages",
        params: &[
            required("url", ParamKind::String, "absolute page URL"),
            optional("enable_javascript", ParamKind::Boolean, "render the page with JavaScript"),
        ],
    },
    ToolDefinition {
        name: "on_page_content_parsing",
        module: ModuleKind::OnPage,
        description: "Parse the structured content of a page",
        endpoint: "/v3/on_page/content_parsing/live",
        params: &[
            required("url", ParamKind::String, "absolute page URL"),
            optional("enable_javascript", ParamKind::Boolean, "render the page with JavaScript"),
        ],
    },
    ToolDefinition {
        name: "on_page_lighthouse",
        module: ModuleKind::OnPage,
        description: "Run a Lighthouse audit for a page",
        endpoint: "/v3/on_page/lighthouse/live/json",
        params: &[
            required("url", ParamKind::String, "absolute page URL"),
            optional("for_mobile", ParamKind::Boolean, "emulate a mobile device"),
        ],
    },
    ToolDefinition {
        name: "dataforseo_labs_google_ranked_keywords",
        module: ModuleKind::DataforseoLabs,
        description: "Get keywords a domain ranks for in Google",
        endpoint: "/v3/dataforseo_labs/google/ranked_keywords/live",
        params: &[TARGET_DOMAIN, LOCATION_NAME, LANGUAGE_CODE, LIMIT],
    },
    ToolDefinition {
        name: "dataforseo_labs_google_keyword_ideas",
        module: ModuleKind::DataforseoLabs,
        description: "Get keyword ideas related to seed keywords",
        endpoint: "/v3/dataforseo_labs/google/keyword_ideas/live",
        params: &[
            required("keywords", ParamKind::StringArray, "seed keywords"),
            LOCATION_NAME,
            LANGUAGE_CODE,
            LIMIT,
        ],
    },
    ToolDefinition {
        name: "dataforseo_labs_google_competitors_domain",
        module: ModuleKind::DataforseoLabs,
        description: "Get organic competitors of a domain",
        endpoint: "/v3/dataforseo_labs/google/competitors_domain/live",
        params: &[TARGET_DOMAIN, LOCATION_NAME, LANGUAGE_CODE, LIMIT],
    },
    ToolDefinition {
        name: "backlinks_summary",
        module: ModuleKind::Backlinks,
        description: "Get a backlink profile overview for a domain, subdomain or page",
        endpoint: "/v3/backlinks/summary/live",
        params: &[
            required("target", ParamKind::String, "domain, subdomain or page URL"),
            optional("include_subdomains", ParamKind::Boolean, "count subdomain backlinks"),
        ],
    },
    ToolDefinition {
        name: "backlinks_backlinks",
        module: ModuleKind::Backlinks,
        description: "List backlinks pointing to a target",
        endpoint: "/v3/backlinks/backlinks/live",
        params: &[
            required("target", ParamKind::String, "domain, subdomain or page URL"),
            optional("mode", ParamKind::String, "as_is, one_per_domain or one_per_anchor"),
            LIMIT,
        ],
    },
    ToolDefinition {
        name: "backlinks_referring_domains",
        module: ModuleKind::Backlinks,
        description: "List domains linking to a target",
        endpoint: "/v3/backlinks/referring_domains/live",
        params: &[
            required("target", ParamKind::String, "domain, subdomain or page URL"),
            LIMIT,
        ],
    },
    ToolDefinition {
        name: "business_data_business_listings_search",
        module: ModuleKind::BusinessData,
        description: "Search business listings by category and location",
        endpoint: "/v3/business_data/business_listings/search/live",
        params: &[
            optional("categories", ParamKind::StringArray, "business categories"),
            optional("title", ParamKind::String, "business title to match"),
            optional(
                "location_coordinate",
                ParamKind::String,
                "latitude,longitude,radius_km",
            ),
            LIMIT,
        ],
    },
    ToolDefinition {
        name: "domain_analytics_whois_overview",
        module: ModuleKind::DomainAnalytics,
        description: "Get WHOIS records enriched with traffic and backlink metrics",
        endpoint: "/v3/domain_analytics/whois/overview/live",
        params: &[
            LIMIT,
            optional("offset", ParamKind::Integer, "offset into the result set"),
        ],
    },
    ToolDefinition {
        name: "domain_analytics_technologies_domain_technologies",
        module: ModuleKind::DomainAnalytics,
        description: "Get the technology stack detected on a domain",
        endpoint: "/v3/domain_analytics/technologies/domain_technologies/live",
        params: &[TARGET_DOMAIN],
    },
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tool_names_are_unique() {
        let names: HashSet<_> = TOOLS.iter().map(|tool| tool.name).collect();
        assert_eq!(names.len(), TOOLS.len());
    }

    #[test]
    fn every_module_has_tools() {
        for module in ModuleKind::ALL {
            assert!(
                TOOLS.iter().any(|tool| tool.module == module),
                "module {module} has no tools"
            );
        }
    }

    #[test]
    fn endpoints_are_v3_paths() {
        assert!(TOOLS.iter().all(|tool| tool.endpoint.starts_with("/v3/")));
    }
}
