crate::lookup::lookup_entity!(Genre, CreateGenre, GenreRepository, GenreRepositoryImpl, "genre");
