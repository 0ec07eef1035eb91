//! End-to-end chat flow against mocked Telegram, CocktailDB and LibreTranslate.

use std::collections::HashMap;

use barkeep::config::BotConfig;
use barkeep::telegram::Update;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "42:flow";

struct Upstreams {
    telegram: MockServer,
    catalog: MockServer,
    translator: MockServer,
}

impl Upstreams {
    async fn start() -> Self {
        let telegram = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 1, "chat": { "id": 7 } }
            })))
            .mount(&telegram)
            .await;

        let catalog = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/filter.php"))
            .and(query_param("i", "vodka"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "drinks": [{ "idDrink": "11", "strDrink": "Screwdriver", "strDrinkThumb": null }]
            })))
            .mount(&catalog)
            .await;
        Mock::given(method("GET"))
            .and(path("/lookup.php"))
            .and(query_param("i", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "drinks": [{
                    "idDrink": "11",
                    "strDrink": "Screwdriver",
                    "strInstructions": "Mix.",
                    "strDrinkThumb": null,
                    "strIngredient1": "Vodka",
                    "strMeasure1": "50 ml"
                }]
            })))
            .mount(&catalog)
            .await;

        // Mocks registered first win, so the catch-all failure goes last.
        let translator = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(json!({ "q": "водка", "source": "ru", "target": "en" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "translatedText": "vodka" })))
            .mount(&translator)
            .await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(json!({ "q": "Screwdriver", "target": "ru" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "translatedText": "Отвёртка" })),
            )
            .mount(&translator)
            .await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "unsupported" })))
            .mount(&translator)
            .await;

        Self {
            telegram,
            catalog,
            translator,
        }
    }

    fn config(&self) -> BotConfig {
        let vars: HashMap<&str, String> = HashMap::from([
            ("TELEGRAM_BOT_TOKEN", TOKEN.to_string()),
            ("TELEGRAM_API_URL", self.telegram.uri()),
            ("COCKTAILDB_BASE_URL", self.catalog.uri()),
            ("LIBRETRANSLATE_URL", format!("{}/translate", self.translator.uri())),
            ("TRANSLATION_TARGET_LANG", "ru".to_string()),
            ("CACHE_DB_PATH", String::new()),
        ]);
        BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    async fn sent_texts(&self) -> Vec<String> {
        self.telegram
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path().ends_with("/sendMessage"))
            .map(|r| {
                let body: Value = serde_json::from_slice(&r.body).unwrap();
                body["text"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

fn text_update(update_id: i64, message_id: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": { "message_id": message_id, "chat": { "id": 7 }, "text": text }
    }))
    .unwrap()
}

#[tokio::test]
async fn search_then_select_sends_translated_list_and_recipe() {
    let upstreams = Upstreams::start().await;
    let app = barkeep::build(&upstreams.config()).unwrap();

    app.scheduler.submit(text_update(1, 10, "водка")).await;
    app.scheduler.submit(text_update(2, 11, "1")).await;
    app.scheduler.shutdown().await;

    let texts = upstreams.sent_texts().await;
    assert_eq!(texts.len(), 2, "unexpected messages: {texts:?}");
    assert_eq!(
        texts[0],
        "Вот что я нашел:\n1. Отвёртка\n\nОтправьте номер, чтобы получить рецепт."
    );
    assert!(texts[1].starts_with("Название: Отвёртка"), "{}", texts[1]);
    assert!(texts[1].contains("Mix."));
}

#[tokio::test]
async fn start_command_greets_without_touching_upstreams() {
    let upstreams = Upstreams::start().await;
    let app = barkeep::build(&upstreams.config()).unwrap();

    app.scheduler.submit(text_update(1, 10, "/start")).await;
    app.scheduler.shutdown().await;

    let texts = upstreams.sent_texts().await;
    assert_eq!(texts, vec![barkeep::bot::messages::WELCOME.to_string()]);
    assert!(upstreams.catalog.received_requests().await.unwrap().is_empty());
    assert!(upstreams.translator.received_requests().await.unwrap().is_empty());
}
