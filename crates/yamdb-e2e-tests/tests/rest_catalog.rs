use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::info;
use tracing_test::traced_test;
use yamdb_e2e_tests::{
    TestUser, client_for, extend_url, launch_env, prepare_env,
    rest::{create_category, create_genre, create_title, get_json},
};

#[tokio::test]
#[traced_test]
async fn test_categories_and_genres() {
    let (args, _config_guard) = prepare_env("test_categories").await.unwrap();
    let (admin, api) = launch_env(args.clone(), TestUser::Admin).await.unwrap();
    let user = client_for(&args, TestUser::User).await.unwrap();
    let categories_url = api.join("categories").unwrap();

    let movie = create_category(&admin, &api, "Movie", "movie").await.unwrap();
    assert_eq!(movie, json!({"name": "Movie", "slug": "movie"}));
    create_category(&admin, &api, "Book", "book").await.unwrap();
    create_category(&admin, &api, "Music", "music").await.unwrap();

    let response = admin
        .post(categories_url.clone())
        .json(&json!({"name": "Film", "slug": "movie"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["slug"].is_array());

    let response = admin
        .post(categories_url.clone())
        .json(&json!({"name": "Bad", "slug": "bad slug!"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = user
        .post(categories_url.clone())
        .json(&json!({"name": "Games", "slug": "games"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let anonymous = reqwest::Client::new();
    let response = anonymous
        .post(categories_url.clone())
        .json(&json!({"name": "Games", "slug": "games"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // page size is 2 in test config
    let page = get_json(&anonymous, categories_url.clone()).await.unwrap();
    info!("Categories page: {page:#}");
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(page["results"][0]["slug"], "book");
    assert!(page["previous"].is_null());
    let next = page["next"].as_str().unwrap();
    assert!(next.ends_with("/api/v1/categories?page=2"), "{next}");

    let page = get_json(&anonymous, next.parse().unwrap()).await.unwrap();
    assert_eq!(page["results"].as_array().unwrap().len(), 1);
    assert!(page["next"].is_null());
    let previous = page["previous"].as_str().unwrap();
    assert!(previous.ends_with("/api/v1/categories"), "{previous}");

    let mut url = categories_url.clone();
    url.query_pairs_mut().append_pair("page", "5");
    let page = get_json(&anonymous, url).await.unwrap();
    assert_eq!(page["count"], 3);
    assert!(page["results"].as_array().unwrap().is_empty());

    let mut url = categories_url.clone();
    url.query_pairs_mut().append_pair("page_size", "1001");
    let response = anonymous.get(url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut url = categories_url.clone();
    url.query_pairs_mut().append_pair("search", "mus");
    let page = get_json(&anonymous, url).await.unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["name"], "Music");

    let response = user
        .delete(extend_url(&categories_url, "music"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = admin
        .delete(extend_url(&categories_url, "music"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = admin
        .delete(extend_url(&categories_url, "music"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let drama = create_genre(&admin, &api, "Drama", "drama").await.unwrap();
    assert_eq!(drama["slug"], "drama");
    let genres = get_json(&anonymous, api.join("genres/").unwrap()).await.unwrap();
    assert_eq!(genres["count"], 1);
}

#[tokio::test]
#[traced_test]
async fn test_titles() {
    let (args, _config_guard) = prepare_env("test_titles").await.unwrap();
    let (admin, api) = launch_env(args.clone(), TestUser::Admin).await.unwrap();
    let moderator = client_for(&args, TestUser::Moderator).await.unwrap();
    let titles_url = api.join("titles").unwrap();

    create_category(&admin, &api, "Movie", "movie").await.unwrap();
    create_category(&admin, &api, "Book", "book").await.unwrap();
    create_genre(&admin, &api, "Drama", "drama").await.unwrap();
    create_genre(&admin, &api, "Sci-Fi", "sci-fi").await.unwrap();

    let gump = create_title(&admin, &api, "Forrest Gump", 1994, "movie", &["drama"])
        .await
        .unwrap();
    assert!(gump["rating"].is_null());
    assert_eq!(gump["category"], json!({"name": "Movie", "slug": "movie"}));
    assert_eq!(gump["genre"], json!([{"name": "Drama", "slug": "drama"}]));
    assert!(gump["description"].is_null());
    create_title(&admin, &api, "Solaris", 1961, "book", &["sci-fi"])
        .await
        .unwrap();
    let solaris = create_title(&admin, &api, "Solaris", 1972, "movie", &["sci-fi", "drama"])
        .await
        .unwrap();

    let response = admin
        .post(titles_url.clone())
        .json(&json!({"name": "Future", "year": 3000, "category": "movie", "genre": ["drama"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["year"].is_array());

    let response = admin
        .post(titles_url.clone())
        .json(&json!({"name": "Unknown", "year": 2000, "category": "game", "genre": ["drama"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["category"].is_array());

    let response = moderator
        .post(titles_url.clone())
        .json(&json!({"name": "Dune", "year": 1965, "category": "book", "genre": ["sci-fi"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let anonymous = reqwest::Client::new();
    let filter = |pairs: &[(&str, &str)]| {
        let mut url = titles_url.clone();
        url.query_pairs_mut().extend_pairs(pairs);
        url
    };

    let page = get_json(&anonymous, filter(&[("name", "sol")])).await.unwrap();
    assert_eq!(page["count"], 2);
    let next = page["next"].as_str();
    assert!(next.is_none());

    let page = get_json(&anonymous, filter(&[("name", "sol"), ("category", "movie")]))
        .await
        .unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["year"], 1972);

    let page = get_json(&anonymous, filter(&[("genre", "drama")])).await.unwrap();
    assert_eq!(page["count"], 2);

    let page = get_json(&anonymous, filter(&[("year", "1961")])).await.unwrap();
    assert_eq!(page["count"], 1);

    // empty filters are ignored
    let page = get_json(&anonymous, filter(&[("year", ""), ("genre", ""), ("category", "")]))
        .await
        .unwrap();
    assert_eq!(page["count"], 3);

    let response = anonymous
        .get(extend_url(&titles_url, "abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].is_string());

    let page = get_json(&anonymous, filter(&[("genre", "drama"), ("page_size", "1")]))
        .await
        .unwrap();
    let next = page["next"].as_str().unwrap();
    assert!(next.contains("genre=drama"), "{next}");
    assert!(next.contains("page=2"), "{next}");

    let solaris_url = extend_url(&titles_url, solaris["id"].as_i64().unwrap());
    let response = admin
        .patch(solaris_url.clone())
        .json(&json!({"description": "Tarkovsky", "genre": ["sci-fi"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let title: Value = response.json().await.unwrap();
    assert_eq!(title["description"], "Tarkovsky");
    assert_eq!(title["genre"], json!([{"name": "Sci-Fi", "slug": "sci-fi"}]));
    assert_eq!(title["year"], 1972);

    let response = admin
        .put(solaris_url.clone())
        .json(&json!({"name": "Solaris"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    // category removal keeps its titles
    let response = admin
        .delete(extend_url(&api.join("categories").unwrap(), "movie"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let title = get_json(&anonymous, solaris_url.clone()).await.unwrap();
    assert!(title["category"].is_null());

    let response = admin.delete(solaris_url.clone()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = anonymous.get(solaris_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
