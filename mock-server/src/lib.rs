use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Entities per page on collection endpoints.
pub const PAGE_SIZE: usize = 2;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    /// ISO-8601, UTC.
    pub released: String,
    /// Milliseconds since the epoch, when known. Used for `/Date(ms)/`.
    pub released_ms: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    pub released: String,
}

pub type Db = Arc<RwLock<Vec<Product>>>;

pub fn seed() -> Vec<Product> {
    [
        ("Chai", 18.0, "2013-04-15T00:00:00Z", 1_365_984_000_000),
        ("Chang", 19.0, "2013-04-16T00:00:00Z", 1_366_070_400_000),
        ("Aniseed Syrup", 10.0, "2013-04-17T00:00:00Z", 1_366_156_800_000),
        ("Chef Anton's Cajun Seasoning", 22.0, "2013-04-18T00:00:00Z", 1_366_243_200_000),
        ("Grandma's Boysenberry Spread", 25.0, "2013-04-19T00:00:00Z", 1_366_329_600_000),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, price, released, ms))| Product {
        id: Uuid::from_u128(i as u128 + 1),
        name: name.to_string(),
        price,
        released: released.to_string(),
        released_ms: Some(ms),
    })
    .collect()
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(seed()));
    Router::new()
        .route("/v2/Products", get(list_verbose))
        .route("/v2/Faulty", get(faulty))
        .route("/v4/Products", get(list_light).post(create_product))
        .route("/v4/{entity}", get(get_product).delete(delete_product))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Verbose (v2) representation of a product.
pub fn verbose_entity(product: &Product) -> Value {
    let released = match product.released_ms {
        Some(ms) => format!("/Date({ms})/"),
        None => product.released.clone(),
    };
    json!({
        "__metadata": {"uri": format!("Products(guid'{}')", product.id), "type": "Catalog.Product"},
        "ID": product.id,
        "Name": product.name,
        "Price": product.price.to_string(),
        "Released": released,
    })
}

/// Light (v4) representation of a product.
pub fn light_entity(product: &Product) -> Value {
    json!({
        "ID": product.id,
        "Name": product.name,
        "Price": product.price,
        "Released": product.released,
    })
}

/// `Products(<uuid>)` -> the uuid.
pub fn parse_key(segment: &str) -> Option<Uuid> {
    let key = segment.strip_prefix("Products(")?.strip_suffix(')')?;
    Uuid::parse_str(key).ok()
}

fn skip_token(params: &HashMap<String, String>) -> usize {
    params
        .get("$skiptoken")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn odata_error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"error": {"code": status.as_u16().to_string(), "message": message}})),
    )
}

async fn list_verbose(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let products = db.read().await;
    let skip = skip_token(&params);
    let page: Vec<Value> = products.iter().skip(skip).take(PAGE_SIZE).map(verbose_entity).collect();

    let mut d = json!({ "results": page });
    if skip + PAGE_SIZE < products.len() {
        d["__next"] = json!(format!("Products?$skiptoken={}", skip + PAGE_SIZE));
    }
    if params.get("$inlinecount").map(String::as_str) == Some("allpages") {
        d["__count"] = json!(products.len().to_string());
    }
    Json(json!({ "d": d }))
}

async fn list_light(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let products = db.read().await;
    let skip = skip_token(&params);
    let page: Vec<Value> = products.iter().skip(skip).take(PAGE_SIZE).map(light_entity).collect();

    let mut body = json!({ "@odata.context": "$metadata#Products", "value": page });
    if skip + PAGE_SIZE < products.len() {
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        body["@odata.nextLink"] = json!(format!("http://{host}/v4/Products?$skiptoken={}", skip + PAGE_SIZE));
    }
    if params.get("$count").map(String::as_str) == Some("true") {
        body["@odata.count"] = json!(products.len());
    }
    Json(body)
}

async fn faulty() -> Json<Value> {
    Json(json!({
        "error": {
            "code": "",
            "message": {"lang": "en-US", "value": "An error occurred while processing this request."},
            "innererror": {
                "internalexception": {
                    "message": "An error occurred while updating the entries. See the inner exception for details.",
                    "internalexception": {"message": "Violation of PRIMARY KEY constraint 'PK_Products'."}
                }
            }
        }
    }))
}

async fn get_product(
    State(db): State<Db>,
    Path(entity): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let id = parse_key(&entity).ok_or_else(|| odata_error(StatusCode::BAD_REQUEST, "Bad key segment"))?;
    let products = db.read().await;
    products
        .iter()
        .find(|p| p.id == id)
        .map(|p| Json(light_entity(p)))
        .ok_or_else(|| odata_error(StatusCode::NOT_FOUND, "Product not found"))
}

async fn create_product(
    State(db): State<Db>,
    Json(input): Json<NewProduct>,
) -> (StatusCode, Json<Value>) {
    let product = Product {
        id: Uuid::new_v4(),
        name: input.name,
        price: input.price,
        released: input.released,
        released_ms: None,
    };
    let body = light_entity(&product);
    db.write().await.push(product);
    (StatusCode::CREATED, Json(body))
}

async fn delete_product(
    State(db): State<Db>,
    Path(entity): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let id = parse_key(&entity).ok_or_else(|| odata_error(StatusCode::BAD_REQUEST, "Bad key segment"))?;
    let mut products = db.write().await;
    let index = products
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| odata_error(StatusCode::NOT_FOUND, "Product not found"))?;
    products.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_stable_ids() {
        let products = seed();
        assert_eq!(products.len(), 5);
        assert_eq!(products[0].id.to_string(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(products[4].id.to_string(), "00000000-0000-0000-0000-000000000005");
    }

    #[test]
    fn verbose_entity_uses_ticks_dates_and_string_prices() {
        let json = verbose_entity(&seed()[0]);
        assert_eq!(json["Released"], "/Date(1365984000000)/");
        assert_eq!(json["Price"], "18");
        assert_eq!(json["ID"], "00000000-0000-0000-0000-000000000001");
    }

    #[test]
    fn verbose_entity_falls_back_to_iso_dates() {
        let mut product = seed()[0].clone();
        product.released_ms = None;
        assert_eq!(verbose_entity(&product)["Released"], "2013-04-15T00:00:00Z");
    }

    #[test]
    fn light_entity_uses_iso_dates_and_numbers() {
        let json = light_entity(&seed()[1]);
        assert_eq!(json["Released"], "2013-04-16T00:00:00Z");
        assert_eq!(json["Price"], 19.0);
    }

    #[test]
    fn parses_entity_keys() {
        assert_eq!(
            parse_key("Products(00000000-0000-0000-0000-000000000003)"),
            Some(Uuid::from_u128(3))
        );
        assert_eq!(parse_key("Products(3)"), None);
        assert_eq!(parse_key("Orders(00000000-0000-0000-0000-000000000003)"), None);
    }

    #[test]
    fn new_product_reads_pascal_case() {
        let input: NewProduct =
            serde_json::from_str(r#"{"Name":"Tofu","Released":"2021-05-06T07:08:09Z"}"#).unwrap();
        assert_eq!(input.name, "Tofu");
        assert_eq!(input.price, 0.0);
    }
}
