use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use yamdb_dal::import::{Fixtures, Importer};
use yamdb_types::config::BackendConfig;

use crate::commands::{open_pool, Executor};

#[derive(Parser, Debug)]
pub struct LoadDataCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(
        short,
        long,
        help = "JSON file with fixtures: users, categories, genres, titles, genre_title, reviews, comments"
    )]
    pub file: PathBuf,
}

pub async fn read_fixtures(path: &Path) -> anyhow::Result<Fixtures> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read fixtures file {path:?}"))?;
    let fixtures = serde_json::from_slice(&data)
        .with_context(|| format!("Invalid fixtures in {path:?}"))?;
    Ok(fixtures)
}

impl Executor for LoadDataCmd {
    async fn run(self) -> anyhow::Result<()> {
        let fixtures = read_fixtures(&self.file).await?;
        let pool = open_pool(&self.backend).await?;
        let stats = Importer::new(pool).import(&fixtures).await?;
        info!("Fixtures loaded from {:?}", self.file);
        println!(
            "Loaded users: {}, categories: {}, genres: {}, titles: {}, genre links: {}, reviews: {}, comments: {}",
            stats.users,
            stats.categories,
            stats.genres,
            stats.titles,
            stats.genre_links,
            stats.reviews,
            stats.comments
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &str = r#"{
        "users": [{"id": 1, "username": "bingobongo", "email": "bingobongo@yamdb.fake", "role": "user"}],
        "categories": [{"id": 1, "name": "Movie", "slug": "movie"}],
        "genres": [{"id": 1, "name": "Drama", "slug": "drama"}],
        "titles": [{"id": 1, "name": "Shawshank Redemption", "year": 1994, "category": 1}],
        "genre_title": [{"title_id": 1, "genre_id": 1}],
        "reviews": [{"id": 1, "title_id": 1, "text": "Great", "author": 1, "score": 10,
            "pub_date": "2019-09-24T21:08:21.567Z"}]
    }"#;

    #[tokio::test]
    async fn test_load_data() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fixtures.json");
        std::fs::write(&file, FIXTURES).unwrap();
        let data_dir = dir.path().join("data");
        let cmd = LoadDataCmd::try_parse_from([
            "load-data",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--file",
            file.to_str().unwrap(),
        ])
        .unwrap();

        let fixtures = read_fixtures(&cmd.file).await.unwrap();
        assert_eq!(fixtures.titles.len(), 1);
        assert!(fixtures.comments.is_empty());

        cmd.run().await.unwrap();
        assert!(data_dir.join("yamdb.db").exists());
    }

    #[tokio::test]
    async fn test_invalid_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fixtures.json");
        std::fs::write(&file, r#"{"titles": [{"name": "No id"}]}"#).unwrap();
        let err = read_fixtures(&file).await.unwrap_err();
        assert!(err.to_string().contains("Invalid fixtures"));
    }
}
