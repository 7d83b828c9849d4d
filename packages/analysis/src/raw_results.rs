//! Paged access to the raw results behind the accessibility curves.

use ram_analysis_models::RawResultsPage;
use ram_database::Db;
use ram_database::results::{count_raw_results, get_raw_results};
use ram_database_models::RawResultsQuery;

use crate::AnalysisError;

/// Returns one page of raw results and the total row count.
///
/// A `page` of 0 is treated as the first page and a `limit` of 0 returns
/// no rows.
///
/// # Errors
///
/// Returns [`AnalysisError::Db`] if a query fails.
pub async fn raw_results(
    db: &Db,
    project_id: i64,
    scenario_id: i64,
    query: RawResultsQuery,
) -> Result<RawResultsPage, AnalysisError> {
    let page = db
        .run(move |conn| {
            let count = count_raw_results(conn, project_id, scenario_id)?;
            let results = get_raw_results(conn, project_id, scenario_id, &query)?;
            Ok(RawResultsPage { count, results })
        })
        .await?;

    log::debug!(
        "p{project_id} s{scenario_id}: raw results page {} ({} of {})",
        query.page,
        page.results.len(),
        page.count
    );

    Ok(page)
}

#[cfg(test)]
mod tests {
    use ram_database_models::{RawResultsSort, SortDirection};

    use super::*;

    const FIXTURE: &str = "
        INSERT INTO projects_aa (id, project_id, name) VALUES (1, 1, 'Boquim'), (2, 1, 'Estância');
        INSERT INTO projects_origins (id, project_id, name) VALUES
            (1, 1, 'Charlie'), (2, 1, 'Alpha'), (3, 1, 'Bravo'), (4, 1, 'Delta');
        INSERT INTO projects_origins_indicators (origin_id, key, label, value) VALUES
            (1, 'population', 'Population', 30),
            (2, 'population', 'Population', 10),
            (3, 'population', 'Population', 20);
        INSERT INTO results (id, project_id, scenario_id, origin_id, project_aa_id) VALUES
            (1, 1, 10, 1, 1), (2, 1, 10, 2, 2), (3, 1, 10, 3, 1), (4, 1, 10, 4, 2);
        INSERT INTO results_poi (result_id, poi_type, travel_time) VALUES
            (1, 'school', 100), (2, 'school', 200), (3, 'school', NULL), (4, 'school', 50);
    ";

    async fn seeded() -> Db {
        let db = Db::open_in_memory().unwrap();
        db.run(|conn| Ok(conn.execute_batch(FIXTURE)?))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn default_query_sorts_by_origin_name() {
        let db = seeded().await;

        let page = raw_results(&db, 1, 10, RawResultsQuery::default())
            .await
            .unwrap();

        assert_eq!(page.count, 3);
        let names: Vec<&str> = page.results.iter().map(|r| r.origin_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo", "Charlie"]);
        assert_eq!(page.results[0].admin_area_name, "Estância");
        assert_eq!(page.results[0].pop_key, "population");
    }

    #[tokio::test]
    async fn pages_keep_total_count() {
        let db = seeded().await;

        let query = RawResultsQuery {
            sort_by: RawResultsSort::PopValue,
            sort_dir: SortDirection::Desc,
            page: 2,
            limit: 2,
        };
        let page = raw_results(&db, 1, 10, query).await.unwrap();

        assert_eq!(page.count, 3);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].origin_name, "Alpha");
    }

    #[tokio::test]
    async fn other_project_is_empty() {
        let db = seeded().await;
        let page = raw_results(&db, 2, 10, RawResultsQuery::default())
            .await
            .unwrap();
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
    }
}
