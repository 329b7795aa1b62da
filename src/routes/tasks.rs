use crate::{
    auth::extractors::AuthenticatedUserId,
    error::AppError,
    models::{Task, TaskInput},
    store::TaskStore,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Retrieves the authenticated user's tasks, newest first.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid session.
#[get("")]
pub async fn get_tasks(
    store: web::Data<dyn TaskStore>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let tasks = store.list(user.0).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: The new `Task` as JSON.
/// - `401 Unauthorized`: If the request lacks a valid session.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
#[post("")]
pub async fn create_task(
    store: web::Data<dyn TaskStore>,
    user: AuthenticatedUserId,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), user.0);
    let created = store.insert(task).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Retrieves a single task by ID. Tasks of other users read as 404.
#[get("/{id}")]
pub async fn get_task(
    store: web::Data<dyn TaskStore>,
    user: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = store.find(user.0, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates a task owned by the authenticated user.
#[put("/{id}")]
pub async fn update_task(
    store: web::Data<dyn TaskStore>,
    user: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let updated = store
        .update(user.0, task_id.into_inner(), task_data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task owned by the authenticated user.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
#[delete("/{id}")]
pub async fn delete_task(
    store: web::Data<dyn TaskStore>,
    user: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    store.delete(user.0, task_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
