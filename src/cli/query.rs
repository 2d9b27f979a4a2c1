//! `query` and `list` commands.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use super::args::{ListArgs, QueryArgs, Show};
use crate::cache::ItemCache;
use crate::enumerate::{ListOptions, list_all};
use crate::post::PostId;

/// Print one derived value of a single post.
pub async fn run_query(cache: &ItemCache, args: &QueryArgs) -> Result<()> {
    let id = PostId::new(&args.year, &args.month, &args.slug).context("Invalid post identity")?;
    let item = cache.lookup(&id);

    let output = match args.show {
        Show::Location => to_json(
            &json!({
                "location": item.location().as_str(),
                "source": item.source_path().display().to_string(),
                "properties": item.properties(),
            }),
            args.pretty,
        )?,
        Show::Content => item.content().await?.to_string(),
        Show::Data => to_json(&item.data().await?.to_json(), args.pretty)?,
        Show::Bundle => to_json(&*item.bundle().await?, args.pretty)?,
    };

    print_out(&output)
}

/// Print every post's projection as a JSON array.
pub async fn run_list(cache: &ItemCache, args: &ListArgs) -> Result<()> {
    let options = ListOptions {
        limit: args.limit,
        include_drafts: args.drafts,
    };
    let fields = args.fields.clone().unwrap_or_default();
    let posts = list_all(cache, &fields, &options).await.with_context(|| {
        format!(
            "Failed to read content directory {}",
            cache.root().dir().display()
        )
    })?;

    print_out(&to_json(&posts, args.pretty)?)
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn print_out(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
