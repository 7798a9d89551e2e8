mod feed;
mod keywords;
mod pagination;
mod query;

pub use feed::{fetch_page, DiscoveryFeed, FeedResult};
pub use query::{build_article_query, ARTICLE_VIEW};
