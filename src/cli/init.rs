use serde_json::json;

use crate::db::connection;
use crate::error::PomoError;

use super::{emit, finish, Ctx};

pub fn run(ctx: Ctx<'_>) -> i32 {
    finish(run_inner(ctx), ctx.json)
}

fn run_inner(ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let path = connection::init_db()?;
    emit(ctx, json!({ "path": path.to_string_lossy() }), || {
        println!("Initialized pomotask at {}", path.display());
    });
    Ok(0)
}
