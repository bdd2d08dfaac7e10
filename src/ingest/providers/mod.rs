pub mod reddit;

pub use reddit::RedditClient;
