use crate::db::{account_repo, connection, settings_repo, UnitOfWork};
use crate::error::PomoError;
use crate::models::SettingsPatch;
use crate::output;

use super::commands::SettingsCommands;
use super::{emit, finish, resolve_account, Ctx};

pub fn run(cmd: SettingsCommands, ctx: Ctx<'_>) -> i32 {
    let result = match cmd {
        SettingsCommands::Show => run_show(ctx),
        SettingsCommands::Set {
            focus_min,
            short_break_min,
            long_break_min,
            long_break_interval,
            auto_start_break,
            auto_start_focus,
            sound_enabled,
            timezone,
        } => run_set(
            SettingsPatch {
                focus_min,
                short_break_min,
                long_break_min,
                long_break_interval,
                auto_start_break,
                auto_start_focus,
                sound_enabled,
                timezone,
            },
            ctx,
        ),
    };
    finish(result, ctx.json)
}

fn run_show(ctx: Ctx<'_>) -> Result<i32, PomoError> {
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;
    let settings = settings_repo::get_settings(&conn, &account.id)?;

    emit(ctx, output::json::record(&settings), || {
        output::text::print_settings(&settings);
    });
    Ok(0)
}

fn run_set(patch: SettingsPatch, ctx: Ctx<'_>) -> Result<i32, PomoError> {
    patch.validate()?;
    let conn = connection::open_db()?;
    let account = resolve_account(&conn, ctx.account)?;

    // Timezone is stored on the account, the rest in the settings row.
    let uow = UnitOfWork::begin(&conn)?;
    let current = settings_repo::get_settings(uow.conn(), &account.id)?;
    let next = patch.apply(&current);
    settings_repo::upsert_settings(uow.conn(), &account.id, &next)?;
    if next.timezone != current.timezone {
        account_repo::update_timezone(uow.conn(), &account.id, &next.timezone)?;
    }
    uow.commit()?;
    tracing::info!(account_id = %account.id, "settings updated");

    emit(ctx, output::json::record(&next), || {
        output::text::print_settings(&next);
    });
    Ok(0)
}
