use catalog_api::app::{router, AppServices};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let app = router(AppServices::in_memory(10));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        read(res).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        read(res).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        read(res).await
    }

    async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.patch(self.url(path)).json(&body).send().await.unwrap();
        read(res).await
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.delete(self.url(path)).send().await.unwrap();
        read(res).await
    }

    async fn create_category(&self, name: &str) -> String {
        let (status, body) = self
            .post("/api/categories", json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["_id"].as_str().unwrap().to_string()
    }

    async fn create_product(&self, body: Value) -> Value {
        let (status, body) = self.post("/api/products", body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let text = res.text().await.unwrap();
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    (status, body)
}

fn product_body(name: &str, category: &str, base_price: f64, stocks: &[(&str, i64)]) -> Value {
    let variants: Vec<Value> = stocks
        .iter()
        .map(|(sku, stock)| {
            json!({
                "name": "Size",
                "value": sku,
                "price": base_price,
                "stock": stock,
                "sku": sku,
            })
        })
        .collect();

    json!({
        "name": name,
        "description": format!("{name} for everyday use"),
        "category": category,
        "basePrice": base_price,
        "variants": variants,
    })
}

#[tokio::test]
async fn health_banner_and_unknown_routes() {
    let server = TestServer::spawn().await;

    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = server.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Exploring the Product Catalog API!".into()));

    let (status, body) = server.get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Requested resource could not be found.");
}

#[tokio::test]
async fn category_lifecycle() {
    let server = TestServer::spawn().await;

    let parent = server.create_category("Apparel").await;
    let (status, body) = server
        .post(
            "/api/categories",
            json!({ "name": "Shirts", "parentCategory": parent }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["parentCategory"]["name"], "Apparel");
    let child = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, body) = server.get("/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Apparel", "Shirts"]);

    let (status, body) = server
        .put(
            &format!("/api/categories/{child}"),
            json!({ "name": "Tops", "parentCategory": parent }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Tops");

    // Making the parent a child of its own child closes a cycle.
    let (status, body) = server
        .put(
            &format!("/api/categories/{parent}"),
            json!({ "name": "Apparel", "parentCategory": child }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("cycle"));

    let (status, _) = server.delete(&format!("/api/categories/{child}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server.get(&format!("/api/categories/{child}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Category not found");
}

#[tokio::test]
async fn category_validation_and_references() {
    let server = TestServer::spawn().await;

    let (status, body) = server.post("/api/categories", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error");
    assert!(body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "name is required"));

    let missing = server.create_category("Temp").await;
    server.delete(&format!("/api/categories/{missing}")).await;
    let (status, body) = server
        .post(
            "/api/categories",
            json!({ "name": "Orphan", "parentCategory": missing }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Parent category not found");

    let (status, body) = server.get("/api/categories/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid id");
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
    let server = TestServer::spawn().await;
    let cat = server.create_category("Kitchen").await;
    server
        .create_product(product_body("Kettle", &cat, 30.0, &[("KT-1", 4)]))
        .await;

    let (status, body) = server.delete(&format!("/api/categories/{cat}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete category with existing products");
}

#[tokio::test]
async fn product_crud_roundtrip() {
    let server = TestServer::spawn().await;
    let cat = server.create_category("Shoes").await;

    let mut body = product_body("Runner", &cat, 100.0, &[("RUN-40", 3), ("RUN-41", 5)]);
    body["discountPercentage"] = json!(25);
    let created = server.create_product(body).await;
    let id = created["_id"].as_str().unwrap().to_string();
    assert_eq!(created["category"]["name"], "Shoes");
    assert_eq!(created["finalPrice"].as_f64(), Some(75.0));
    assert_eq!(created["totalStock"], 8);

    let (status, fetched) = server.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["name"], "Runner");

    let (status, updated) = server
        .put(
            &format!("/api/products/{id}"),
            product_body("Trail Runner", &cat, 120.0, &[("RUN-40", 3)]),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["name"], "Trail Runner");
    assert_eq!(updated["data"]["variants"].as_array().unwrap().len(), 1);

    let (status, body) = server.delete(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");

    let (status, body) = server.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");
}

#[tokio::test]
async fn product_writes_are_validated() {
    let server = TestServer::spawn().await;
    let cat = server.create_category("Tools").await;

    let (status, body) = server
        .post("/api/products", json!({ "name": "X", "basePrice": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e == "category is required"));
    assert!(errors.iter().any(|e| e == "basePrice must be greater than or equal to 0"));

    let ghost = server.create_category("Ghost").await;
    server.delete(&format!("/api/categories/{ghost}")).await;
    let (status, body) = server
        .post("/api/products", product_body("Hammer", &ghost, 12.0, &[]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Category not found");

    server
        .create_product(product_body("Hammer", &cat, 12.0, &[("HM-1", 2)]))
        .await;
    let (status, _) = server
        .post("/api/products", product_body("Mallet", &cat, 14.0, &[("HM-1", 2)]))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let res = server
        .client
        .post(server.url("/api/products"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_listing_paginates_and_filters() {
    let server = TestServer::spawn().await;
    let cat = server.create_category("Books").await;
    for (idx, price) in [5.0, 15.0, 25.0].into_iter().enumerate() {
        let sku = format!("BK-{idx}");
        server
            .create_product(product_body(
                &format!("Book {idx}"),
                &cat,
                price,
                &[(sku.as_str(), 1)],
            ))
            .await;
    }

    let (status, body) = server.get("/api/products?page=1&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["current"], 1);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["totalItems"], 3);

    let (_, body) = server
        .get("/api/products?minPrice=10&sortBy=basePrice")
        .await;
    let prices: Vec<f64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["basePrice"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![15.0, 25.0]);

    let (_, body) = server.get("/api/products?search=book%202").await;
    assert_eq!(body["pagination"]["totalItems"], 1);

    let (status, _) = server.get("/api/products?category=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inventory_patch_sets_variant_stock() {
    let server = TestServer::spawn().await;
    let cat = server.create_category("Garden").await;
    let product = server
        .create_product(product_body("Hose", &cat, 20.0, &[("HS-1", 7)]))
        .await;
    let id = product["_id"].as_str().unwrap();
    let variant = product["variants"][0]["_id"].as_str().unwrap();
    let path = format!("/api/products/{id}/inventory");

    let (status, body) = server
        .patch(&path, json!({ "variantId": variant, "stock": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["variants"][0]["stock"], 2);
    assert_eq!(body["data"]["totalStock"], 2);

    let (status, body) = server
        .patch(&path, json!({ "variantId": variant, "stock": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Stock cannot be negative");

    let (status, _) = server.patch(&path, json!({ "variantId": variant })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = product_body("Other", &cat, 1.0, &[("OT-1", 1)]);
    let other = server.create_product(other).await;
    let foreign = other["variants"][0]["_id"].as_str().unwrap();
    let (status, body) = server
        .patch(&path, json!({ "variantId": foreign, "stock": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Variant not found");

    let (status, body) = server.patch(&path, json!({ "stock": 9 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalStock"], 2);
}

#[tokio::test]
async fn low_stock_report_lists_lines_at_or_below_threshold() {
    let server = TestServer::spawn().await;
    let cat = server.create_category("Electronics").await;
    server
        .create_product(product_body("Cable", &cat, 9.0, &[("CB-S", 3), ("CB-L", 50)]))
        .await;
    server
        .create_product(product_body("Adapter", &cat, 15.0, &[]))
        .await;

    let (status, body) = server.get("/api/reports/low-stock").await;
    assert_eq!(status, StatusCode::OK);
    let report = &body["data"];
    assert_eq!(report["threshold"], 10);
    assert_eq!(report["totalLowStockItems"], 2);

    let items = report["items"].as_array().unwrap();
    assert_eq!(items[0]["productName"], "Cable");
    assert_eq!(items[0]["variantName"], "Size: CB-S");
    assert_eq!(items[0]["currentStock"], 3);
    assert_eq!(items[0]["category"], "Electronics");
    assert_eq!(items[1]["productName"], "Adapter");
    assert_eq!(items[1]["variantName"], "Default");
    assert_eq!(items[1]["variantId"], Value::Null);

    let (_, body) = server.get("/api/reports/low-stock?threshold=100").await;
    assert_eq!(body["data"]["totalLowStockItems"], 3);

    let (_, body) = server.get("/api/reports/low-stock?threshold=abc").await;
    assert_eq!(body["data"]["threshold"], 10);

    let (_, body) = server.get("/api/reports/low-stock?threshold=3.5").await;
    assert_eq!(body["data"]["threshold"], 3);
    assert_eq!(body["data"]["totalLowStockItems"], 2);
}

#[tokio::test]
async fn inventory_summary_groups_by_category() {
    let server = TestServer::spawn().await;
    let toys = server.create_category("Toys").await;
    let games = server.create_category("Games").await;
    server
        .create_product(product_body("Ball", &toys, 5.0, &[("BL-1", 0), ("BL-2", 4)]))
        .await;
    server
        .create_product(product_body("Chess", &games, 30.0, &[("CH-1", 6)]))
        .await;

    let mut hidden = product_body("Retired", &games, 1.0, &[("RT-1", 100)]);
    hidden["isActive"] = json!(false);
    server.create_product(hidden).await;

    let (status, body) = server.get("/api/reports/inventory-summary").await;
    assert_eq!(status, StatusCode::OK);
    let summary = &body["data"];
    assert_eq!(summary["totalProducts"], 2);
    assert_eq!(summary["totalVariants"], 3);
    assert_eq!(summary["totalStock"], 10);
    assert_eq!(summary["outOfStockItems"], 1);
    assert_eq!(summary["categorySummary"][&toys]["name"], "Toys");
    assert_eq!(summary["categorySummary"][&toys]["totalStock"], 4);
    assert_eq!(summary["categorySummary"][&games]["products"], 1);
}

#[tokio::test]
async fn products_by_category_orders_by_count() {
    let server = TestServer::spawn().await;
    let small = server.create_category("Small").await;
    let big = server.create_category("Big").await;
    server
        .create_product(product_body("Solo", &small, 10.0, &[("SO-1", 1)]))
        .await;
    server
        .create_product(product_body("First", &big, 10.0, &[("FI-1", 1)]))
        .await;
    server
        .create_product(product_body("Second", &big, 20.0, &[("SE-1", 1), ("SE-2", 1)]))
        .await;

    let (status, body) = server.get("/api/reports/products-by-category").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["_id"], big.as_str());
    assert_eq!(rows[0]["categoryName"], "Big");
    assert_eq!(rows[0]["productCount"], 2);
    assert_eq!(rows[0]["averagePrice"].as_f64(), Some(15.0));
    assert_eq!(rows[0]["totalVariants"], 3);
    assert_eq!(rows[1]["categoryName"], "Small");
}
