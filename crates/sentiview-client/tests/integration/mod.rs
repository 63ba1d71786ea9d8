mod blocks;
mod cache;
mod fetcher;
mod upload;
