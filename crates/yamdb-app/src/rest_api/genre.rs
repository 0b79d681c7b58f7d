use yamdb_dal::genre::{CreateGenre, GenreRepository};

crate::lookup_api!(GenreRepository, CreateGenre);
