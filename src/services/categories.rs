use crate::backend::{Query, RestClient};
use crate::error::Result;
use crate::models::{Category, Taxonomy};

const CATEGORIES: &str = "categories";

/// Load the active taxonomy used to populate the discipline and field pickers.
pub async fn load_taxonomy(client: &RestClient) -> Result<Taxonomy> {
    let query = Query::from(CATEGORIES)
        .select(
            "id,level_1_discipline,level_2_field,level_3_specialization,\
             level_4_subspecialization,description,is_active",
        )
        .eq("is_active", "true")
        .order_asc("level_1_discipline");
    let page = client.select::<Category>(&query).await?;
    tracing::debug!("Loaded {} categories", page.rows.len());
    Ok(Taxonomy::new(page.rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_client;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn loads_active_categories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/categories"))
            .and(query_param("is_active", "eq.true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "level_1_discipline": "Physics", "level_2_field": "Optics"},
                {"id": "2", "level_1_discipline": "Biology", "level_2_field": "Genetics"},
                {"id": "3", "level_1_discipline": "Biology", "level_2_field": "Ecology"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let taxonomy = load_taxonomy(&test_client(&server)).await.unwrap();
        assert_eq!(taxonomy.disciplines(), vec!["Biology", "Physics"]);
        assert_eq!(taxonomy.fields_for("Biology"), vec!["Ecology", "Genetics"]);
    }
}
