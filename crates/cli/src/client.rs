//! Thin HTTP client for the `submit` / `status` CLI subcommands.

use serde_json::json;

pub async fn submit(
    server: &str,
    urls: Vec<String>,
    site_url: Option<String>,
    max_pages: u32,
) -> anyhow::Result<()> {
    let body = match (urls.is_empty(), site_url) {
        (false, None) => json!({ "urls": urls }),
        (true, Some(site_url)) => json!({ "site_url": site_url, "max_pages": max_pages }),
        (false, Some(_)) => anyhow::bail!("specify either --url or --site-url, not both"),
        (true, None) => anyhow::bail!("provide at least one --url or a --site-url"),
    };

    let client = reqwest::Client::new();
    let response = client.post(format!("{server}/scrape")).json(&body).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        anyhow::bail!("server returned {status}: {text}");
    }
    println!("{text}");
    Ok(())
}

pub async fn status(server: &str, job_id: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{server}/scrape/status"))
        .query(&[("id", job_id)])
        .send()
        .await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        anyhow::bail!("server returned {status}: {text}");
    }
    println!("{text}");
    Ok(())
}
