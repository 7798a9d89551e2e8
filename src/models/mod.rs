mod article;
mod category;
mod collection;
mod filter;
mod preferences;

pub use article::{parse_publication_date, Article, SavedArticle};
pub(crate) use article::SavedArticleRow;
pub use category::{Category, Taxonomy};
pub use collection::{
    Collection, CollectionArticle, CollectionUpdate, NewCollection, NewMembership,
};
pub use filter::FilterState;
pub use preferences::{FeedPreferences, KeywordLogic};

#[cfg(test)]
pub(crate) use article::fixtures;
