//! Basic example demonstrating GET and POST requests.
//!
//! This example shows how to:
//! - Create a fetcher with a base endpoint and default headers
//! - Make GET requests with query parameters
//! - Make POST requests with JSON and plain-text bodies
//! - Inspect status codes, since HTTP errors are not failures
//!
//! Run with: `cargo run --example basic_call`

use fetcher::{Body, Error, Fetcher, QueryParams, RequestOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Exchange entries are forwarded to tracing under the `fetcher` target
    tracing_subscriber::fmt()
        .with_env_filter("fetcher=debug,basic_call=info")
        .init();

    let fetcher = Fetcher::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .default_header("User-Agent", "fetcher-demo/0.1")?
        .build()?;

    println!("=== GET Request ===");
    let post = fetcher.get::<Post>("/posts/1", None, None).await?;
    println!("Post #{}: {}", post.data.id, post.data.title);
    println!("Status: {}, took {:?}", post.status, post.latency);

    println!("\n=== GET with query parameters ===");
    let query = QueryParams::new()
        .with("userId", 1)
        .with("_limit", 3)
        .with("tag", None::<String>);
    let posts = fetcher.get::<Vec<Post>>("/posts", Some(&query), None).await?;
    for post in posts.data.iter() {
        println!("  - {}", post.title);
    }

    println!("\n=== POST Request ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post.".to_string(),
        user_id: 1,
    };
    let created = fetcher
        .post::<serde_json::Value>("/posts", None, Some(Body::json(&new_post)?), None)
        .await?;
    println!("Created: {}", created.data);

    println!("\n=== POST plain text ===");
    let options = RequestOptions::new().with_header("Content-Type", "text/plain")?;
    let echoed = fetcher
        .post::<serde_json::Value>("/posts", None, Some(Body::from("hello world!")), Some(options))
        .await?;
    println!("Status: {}", echoed.status);

    println!("\n=== Missing resource ===");
    let missing = fetcher.get::<serde_json::Value>("/posts/99999", None, None).await?;
    if !missing.is_success() {
        println!("Server answered {} with {}", missing.status, missing.data);
    }

    println!("\n{} requests answered", fetcher.sequence());
    Ok(())
}
