use crate::model::{Author, BindableModel, Comment, Post};
use crate::store::traits::SeedStore;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::Value;

/// Insert a model through its serialized form
async fn insert_model<T: BindableModel, S: SeedStore + ?Sized>(store: &S, model: &T) -> Result<()> {
    let record = match serde_json::to_value(model)
        .with_context(|| format!("Failed to encode seed {}", T::NAME))?
    {
        Value::Object(record) => record,
        other => bail!("seed {} did not serialize to an object: {}", T::NAME, other),
    };
    store.insert(T::TABLE, record).await
}

fn create_post(id: i64, author_id: i64, slug: &str, title: &str, published: bool) -> Post {
    Post {
        id,
        author_id,
        slug: slug.to_string(),
        title: title.to_string(),
        body: format!("{} (seed post)", title),
        published,
        created_at: Utc::now().to_rfc3339(),
    }
}

fn create_comment(id: i64, post_id: i64, code: &str, body: &str) -> Comment {
    Comment {
        id,
        post_id,
        code: code.to_string(),
        body: body.to_string(),
    }
}

pub async fn load_seed_data<S: SeedStore + ?Sized>(store: &S) -> Result<()> {
    load_authors(store).await?;
    load_posts(store).await?;
    load_comments(store).await?;
    log::info!("Seed data loaded");
    Ok(())
}

async fn load_authors<S: SeedStore + ?Sized>(store: &S) -> Result<()> {
    let authors = [
        Author {
            id: 1,
            username: "ada".to_string(),
            display_name: "Ada Lovelace".to_string(),
        },
        Author {
            id: 2,
            username: "grace".to_string(),
            display_name: "Grace Hopper".to_string(),
        },
    ];

    for author in &authors {
        insert_model(store, author).await?;
    }
    Ok(())
}

async fn load_posts<S: SeedStore + ?Sized>(store: &S) -> Result<()> {
    let posts = [
        create_post(1, 1, "engines", "Notes on the Analytical Engine", true),
        create_post(2, 1, "drafts", "Unfinished thoughts", false),
        create_post(3, 2, "compilers", "The first compiler", true),
    ];

    for post in &posts {
        insert_model(store, post).await?;
    }
    Ok(())
}

async fn load_comments<S: SeedStore + ?Sized>(store: &S) -> Result<()> {
    let comments = [
        create_comment(1, 1, "c-1", "Fascinating."),
        create_comment(2, 1, "c-2", "Could it compose music?"),
        create_comment(3, 3, "c-3", "Bugs, literally."),
    ];

    for comment in &comments {
        insert_model(store, comment).await?;
    }
    Ok(())
}
