use sqlx::PgPool;

/// Clear the LinkedIn published flag on jobs posted through `account_id`.
pub async fn unpublish_for_account(pool: &PgPool, account_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET posted_to_linkedin = FALSE, updated_at = now()
        WHERE unipile_account_id = $1 AND posted_to_linkedin = TRUE
        "#,
    )
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
