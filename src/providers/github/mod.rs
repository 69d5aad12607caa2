mod client;
mod provider;
mod run_url;
mod types;


pub use client::DEFAULT_API_BASE;
pub use provider::GitHubProvider;
