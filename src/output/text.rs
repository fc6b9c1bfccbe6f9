use crate::engine::{DailyStats, RecoveryReport, StaleNotice, WeeklyStats};
use crate::models::{Account, Page, Session, Settings, Task};

fn short(id: &str) -> &str {
    &id[..std::cmp::min(8, id.len())]
}

pub fn print_account(a: &Account, active: bool) {
    println!("Account: {} ({})", a.name, a.id);
    println!("  Timezone: {}", a.timezone);
    println!("  Created: {}", a.created_at);
    if active {
        println!("  Active: yes");
    }
}

pub fn print_account_list(accounts: &[Account], active_id: Option<&str>) {
    if accounts.is_empty() {
        println!("No accounts found.");
        return;
    }
    for a in accounts {
        let marker = if active_id == Some(a.id.as_str()) { "*" } else { " " };
        println!("{marker} {} ({}) {}", a.name, short(&a.id), a.timezone);
    }
}

pub fn print_task(t: &Task) {
    println!("Task: {} ({})", t.title, t.id);
    if let Some(ref desc) = t.description {
        println!("  Description: {desc}");
    }
    println!("  Status: {}", t.status.as_str());
    println!("  Priority: {}", t.priority.as_str());
    if let Some(date) = t.planned_date {
        println!("  Planned: {date}");
    }
    println!(
        "  Pomodoros: {}/{}",
        t.completed_pomodoros, t.estimate_pomodoros
    );
    println!("  Version: {}", t.version);
    if let Some(completed) = t.completed_at {
        println!("  Completed: {completed}");
    }
    println!("  Updated: {}", t.updated_at);
}

pub fn print_task_list(page: &Page<Task>) {
    if page.items.is_empty() {
        println!("No tasks found.");
        return;
    }
    for t in &page.items {
        println!(
            "  [{}] {} ({}) {} {}/{} v{}",
            t.status.as_str(),
            t.title,
            short(&t.id),
            t.priority.as_str(),
            t.completed_pomodoros,
            t.estimate_pomodoros,
            t.version
        );
    }
    print_page_footer(page);
}

pub fn print_session(s: &Session) {
    println!("Session: {} ({})", s.id, s.session_type.as_str());
    println!("  Status: {}", s.status().as_str());
    if let Some(ref task_id) = s.task_id {
        println!("  Task: {task_id}");
    }
    println!("  Duration: {}s", s.duration_sec);
    println!("  Started: {}", s.started_at);
    if let Some(ended) = s.ended_at() {
        println!("  Ended: {ended}");
    }
}

pub fn print_session_list(page: &Page<Session>) {
    if page.items.is_empty() {
        println!("No sessions found.");
        return;
    }
    for s in &page.items {
        println!(
            "  [{}] {} ({}) {}s started {}",
            s.status().as_str(),
            s.session_type.as_str(),
            short(&s.id),
            s.duration_sec,
            s.started_at
        );
    }
    print_page_footer(page);
}

fn print_page_footer<T>(page: &Page<T>) {
    println!(
        "Page {} ({} per page, {} total)",
        page.page, page.page_size, page.total
    );
}

pub fn print_recovery(r: &RecoveryReport) {
    println!(
        "Reset {} in-progress session(s); timer resumes in {}",
        r.reset_count,
        r.timer_state.as_str()
    );
}

pub fn print_daily(d: &DailyStats) {
    println!("Stats for {}", d.date);
    println!("  Focus sessions: {}", d.focus_count);
    println!("  Focus minutes: {}", d.total_focus_minutes);
    println!("  Completed tasks: {}", d.completed_tasks);
}

pub fn print_weekly(w: &WeeklyStats) {
    println!("Week from {}", w.start);
    for (day, minutes) in &w.days {
        println!("  {day}: {minutes} min");
    }
    println!("  Total: {} min", w.total_focus_minutes);
}

pub fn print_settings(s: &Settings) {
    println!("Focus: {} min", s.focus_min);
    println!("Short break: {} min", s.short_break_min);
    println!("Long break: {} min", s.long_break_min);
    println!("Long break every: {} focus sessions", s.long_break_interval);
    println!("Auto-start break: {}", s.auto_start_break);
    println!("Auto-start focus: {}", s.auto_start_focus);
    println!("Sound: {}", s.sound_enabled);
    println!("Timezone: {}", s.timezone);
}

pub fn print_stale_notice(n: &StaleNotice) {
    eprintln!("Warning: {}", n.message);
    if n.discarded_edits > 0 {
        eprintln!("  Discarded {} unsynced edit(s).", n.discarded_edits);
    }
}
