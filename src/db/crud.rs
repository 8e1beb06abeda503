use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::model::{ImageRow, embedding_to_bytes};

/// 添加图片记录
pub async fn add_image<'c, E>(executor: E, name: &str, path: &str, embedding: &[f32]) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let embedding = embedding_to_bytes(embedding);
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO image (name, path, embedding)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(path)
    .bind(embedding)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// 删除图片记录，返回受影响的行数
pub async fn delete_image(executor: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM image WHERE id = ?").bind(id).execute(executor).await?;

    Ok(result.rows_affected())
}

pub async fn get_image(executor: &SqlitePool, id: i64) -> Result<Option<ImageRow>> {
    sqlx::query_as("SELECT id, name, path, embedding FROM image WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// 按名称查找图片，名称重复时返回 ID 最小的一条
pub async fn get_image_by_name(executor: &SqlitePool, name: &str) -> Result<Option<ImageRow>> {
    sqlx::query_as(
        r#"
        SELECT id, name, path, embedding FROM image
        WHERE name = ? ORDER BY id ASC LIMIT 1
        "#,
    )
    .bind(name)
    .fetch_optional(executor)
    .await
}

/// 分页获取图片列表，按 ID 升序
pub async fn get_images(executor: &SqlitePool, limit: usize, offset: usize) -> Result<Vec<ImageRow>> {
    let limit = limit as i64;
    let offset = offset as i64;
    sqlx::query_as(
        r#"
        SELECT id, name, path, embedding FROM image
        ORDER BY id ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

/// 获取所有图片的特征向量，按 ID 升序
pub async fn get_all_images(executor: &SqlitePool) -> Result<Vec<ImageRow>> {
    sqlx::query_as("SELECT id, name, path, embedding FROM image ORDER BY id ASC")
        .fetch_all(executor)
        .await
}

/// 任意一条记录的向量字节长度，用于校验维度
pub async fn get_embedding_len(executor: &SqlitePool) -> Result<Option<i64>> {
    sqlx::query_scalar("SELECT length(embedding) FROM image ORDER BY id ASC LIMIT 1")
        .fetch_optional(executor)
        .await
}

/// 除 `id` 以外引用同一文件的记录数量
pub async fn count_other_by_path(executor: &SqlitePool, path: &str, id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM image WHERE path = ? AND id != ?")
        .bind(path)
        .bind(id)
        .fetch_one(executor)
        .await
}

/// 查询数据库中的图片数量
pub async fn get_count(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM image").fetch_one(executor).await
}
