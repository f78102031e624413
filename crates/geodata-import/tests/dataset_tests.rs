//! Dataset imports end to end: mocked HTTP sources, real database

use geodata_import::config::ImportConfig;
use geodata_import::datasets::MunicipalitiesProvider;
use geodata_import::download::Downloader;
use geodata_import::error::DatasetError;
use geodata_import::pipeline::DatasetProvider;
use geodata_import::{DatasetKind, ImportRun, StagingArea};
use sqlx::PgPool;
use std::io::{Cursor, Write};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

mod common;
use common::{column_names, index_names, row_count, staging_in, staging_leftovers, table_exists};

const PROVINCES_CSV: &str = "\
Relación de provincias
CODIGO,LITERAL
1,Álava
2,Albacete
abc,Not a province
99,X
";

const INDICATORS_CSV: &str = "\
Código,Descripción
t1_1,Total de personas
t2_1,Hombres
otro,Sin código
";

const CENSUS_HEADER: &str = "ccaa,cpro,cmun,dist,secc,t1_1,t2_1\n";

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

async fn mount(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer, staging_dir: &std::path::Path) -> ImportConfig {
    let mut config = ImportConfig::default();
    config.staging = staging_in(staging_dir);
    config.sources.provinces = format!("{}/codprov.csv", server.uri());
    config.sources.census_indicators = format!("{}/indicadores.csv", server.uri());
    config.sources.census_data = format!("{}/census_csv.zip", server.uri());
    config.sources.municipalities = format!("{}/descargaDir?sec=114023", server.uri());
    config
}

// ============================================================================
// Provinces
// ============================================================================

#[sqlx::test(migrations = false)]
async fn test_provinces_import(pool: PgPool) -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount(&server, "/codprov.csv", PROVINCES_CSV.as_bytes().to_vec()).await;
    let staging = tempfile::tempdir()?;

    let reports = ImportRun::new(config_for(&server, staging.path()), vec![DatasetKind::Provinces])?
        .execute(&pool)
        .await?;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].table, "provinces_spain");
    assert_eq!(reports[0].rows, Some(3));

    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT cpro, province FROM provinces_spain ORDER BY cpro")
            .fetch_all(&pool)
            .await?;
    assert_eq!(
        rows,
        vec![
            ("01".to_string(), "Álava".to_string()),
            ("02".to_string(), "Albacete".to_string()),
            ("99".to_string(), "X".to_string()),
        ]
    );
    assert_eq!(index_names(&pool, "provinces_spain").await?, vec!["provinces_spain_pkey"]);
    assert_eq!(staging_leftovers(staging.path()), 0);
    Ok(())
}

// ============================================================================
// Census
// ============================================================================

#[sqlx::test(migrations = false)]
async fn test_census_import(pool: PgPool) -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount(&server, "/indicadores.csv", INDICATORS_CSV.as_bytes().to_vec()).await;
    let first = format!("{}01,01,001,01,001,1200,580\n01,01,001,01,002,950,\n", CENSUS_HEADER);
    let second = format!("{}02,22,001,01,001,300,140\n", CENSUS_HEADER);
    let archive = zip_bytes(&[
        ("indicadores_seccion_censal_csv/C2011_ccaa01_Indicadores.csv", first.as_str()),
        ("indicadores_seccion_censal_csv/C2011_ccaa02_Indicadores.csv", second.as_str()),
        ("indicadores_seccion_censal_csv/LEEME.txt", "not data"),
    ]);
    mount(&server, "/census_csv.zip", archive).await;
    let staging = tempfile::tempdir()?;

    let reports = ImportRun::new(config_for(&server, staging.path()), vec![DatasetKind::Census])?
        .execute(&pool)
        .await?;

    assert_eq!(reports[0].sources, 2);
    assert_eq!(reports[0].rows, Some(3));
    assert_eq!(
        column_names(&pool, "census_spain").await?,
        vec!["ccaa", "cpro", "cmun", "dist", "secc", "t1_1", "t2_1"]
    );
    assert_eq!(row_count(&pool, "census_spain").await?, 3);

    let missing: Option<i64> = sqlx::query_scalar(
        "SELECT t2_1 FROM census_spain WHERE cpro = '01' AND cmun = '001' AND secc = '002'",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(missing, None);

    let comment: Option<String> =
        sqlx::query_scalar("SELECT col_description('census_spain'::regclass, 6)")
            .fetch_one(&pool)
            .await?;
    assert_eq!(comment.as_deref(), Some("Total de personas"));

    assert_eq!(
        index_names(&pool, "census_spain").await?,
        vec!["census_spain_pkey", "province_municipality_idx"]
    );
    Ok(())
}

#[sqlx::test(migrations = false)]
async fn test_census_without_indicators_fails(pool: PgPool) -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount(&server, "/indicadores.csv", b"Codigo,Descripcion\n".to_vec()).await;
    mount(&server, "/census_csv.zip", zip_bytes(&[("a.csv", CENSUS_HEADER)])).await;
    let staging = tempfile::tempdir()?;

    let err = ImportRun::new(config_for(&server, staging.path()), vec![DatasetKind::Census])?
        .execute(&pool)
        .await
        .unwrap_err();

    assert!(!err.is_acquisition());
    assert!(!table_exists(&pool, "census_spain").await?);
    assert!(!table_exists(&pool, "_tmp_census_spain").await?);
    Ok(())
}

// ============================================================================
// Runs
// ============================================================================

#[sqlx::test(migrations = false)]
async fn test_run_stops_at_first_failure(pool: PgPool) -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount(&server, "/codprov.csv", PROVINCES_CSV.as_bytes().to_vec()).await;
    Mock::given(method("GET"))
        .and(path("/indicadores.csv"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let staging = tempfile::tempdir()?;

    let err = ImportRun::all(config_for(&server, staging.path()))?
        .execute(&pool)
        .await
        .unwrap_err();

    assert_eq!(err.dataset(), "census");
    assert!(err.is_acquisition());
    assert!(table_exists(&pool, "provinces_spain").await?);
    assert!(!table_exists(&pool, "census_spain").await?);
    assert!(!table_exists(&pool, "municipalities_spain").await?);

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.iter().all(|r| r.url.path() != "/descargaDir"));
    assert_eq!(staging_leftovers(staging.path()), 0);
    Ok(())
}

// ============================================================================
// Municipalities acquisition
// ============================================================================

#[tokio::test]
async fn test_municipalities_provider_extracts_2011_layer() {
    let server = MockServer::start().await;
    let archive = zip_bytes(&[
        ("SIANE/20110101/se89_3_admin_muni_a_x.shp", "shp"),
        ("SIANE/20110101/se89_3_admin_muni_a_x.dbf", "dbf"),
        ("SIANE/20110101/se89_3_admin_muni_a_y.shp", "shp"),
        ("SIANE/20110101/se89_3_admin_prov_a_x.shp", "prov"),
        ("SIANE/20160101/se89_3_admin_muni_a_x.shp", "newer"),
    ]);
    mount(&server, "/descargaDir", archive).await;
    let staging_dir = tempfile::tempdir().unwrap();
    let staging = StagingArea::acquire(&staging_in(staging_dir.path())).unwrap();

    let provider = MunicipalitiesProvider::new(
        Downloader::new(&Default::default()).unwrap(),
        format!("{}/descargaDir?sec=114023", server.uri()),
    );
    let descriptor = provider.prepare(&staging).await.unwrap();

    let names: Vec<_> = descriptor
        .shapefiles
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["se89_3_admin_muni_a_x.shp", "se89_3_admin_muni_a_y.shp"]);
    assert!(descriptor.shapefiles.iter().all(|p| p.starts_with(staging.path())));
}

#[tokio::test]
async fn test_municipalities_provider_requires_shapefiles() {
    let server = MockServer::start().await;
    mount(&server, "/descargaDir", zip_bytes(&[("readme.txt", "nothing here")])).await;
    let staging_dir = tempfile::tempdir().unwrap();
    let staging = StagingArea::acquire(&staging_in(staging_dir.path())).unwrap();

    let provider = MunicipalitiesProvider::new(
        Downloader::new(&Default::default()).unwrap(),
        format!("{}/descargaDir", server.uri()),
    );

    assert!(matches!(
        provider.prepare(&staging).await,
        Err(DatasetError::MissingArtifact(_))
    ));
}
