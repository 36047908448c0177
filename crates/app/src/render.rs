use services::{Draft, FinishReport, ItemVisit, Notice, NoticeLevel, SessionProgress, StudyPlayer};
use study_core::model::{ChoiceId, StudyItem};

fn mark(on: bool) -> &'static str {
    if on { "[x]" } else { "[ ]" }
}

/// Print the current item with its per-visit presentation order.
pub fn item(player: &StudyPlayer) {
    let (Some(item), Some(visit)) = (player.current_item(), player.visit()) else {
        return;
    };
    let progress = player.progress();
    println!();
    println!("── {}/{} · {} ──", progress.position, progress.total, item.kind());

    match item {
        StudyItem::Flashcard(card) => {
            println!("{}", card.front());
            if visit.is_flipped() {
                println!("  → {}", card.back());
                println!("(knew | missed)");
            } else {
                println!("(flip to reveal)");
            }
        }
        StudyItem::Quiz(q) => {
            println!("{}", q.question());
            let selected = match visit.draft() {
                Draft::Quiz { selected } => *selected,
                _ => None,
            };
            for (pos, id) in visit.order().iter().enumerate() {
                if let Some(choice) = q.choice(*id) {
                    let on = selected == Some(*id);
                    println!("  {} {}. {}", mark(on), pos + 1, choice.text);
                }
            }
        }
        StudyItem::Checkbox(q) => {
            println!("{} (select all that apply)", q.question());
            for (pos, id) in visit.order().iter().enumerate() {
                if let Some(choice) = q.choice(*id) {
                    let on = matches!(visit.draft(), Draft::Checkbox { selected } if selected.contains(id));
                    println!("  {} {}. {}", mark(on), pos + 1, choice.text);
                }
            }
        }
        StudyItem::Written(w) => {
            println!("{}", w.question());
            if let Draft::Written { text } = visit.draft() {
                if !text.is_empty() {
                    println!("  > {text}");
                }
            }
        }
        StudyItem::Matching(m) => {
            println!("{}", m.prompt());
            for (pos, pair) in m.pairs().iter().enumerate() {
                let matched = matched_right(visit, pair.id)
                    .and_then(|right| m.pair(right))
                    .map_or_else(|| "?".to_string(), |p| p.right.to_string());
                println!("  {}. {} ↔ {}", pos + 1, pair.left, matched);
            }
            println!("  right side:");
            for (pos, id) in visit.order().iter().enumerate() {
                if let Some(pair) = m.pair(*id) {
                    println!("    {}. {}", pos + 1, pair.right);
                }
            }
        }
        StudyItem::Order(o) => {
            println!("{}", o.prompt());
            if let Draft::Order { arrangement } = visit.draft() {
                for (pos, id) in arrangement.iter().enumerate() {
                    if let Some(step) = o.step(*id) {
                        println!("  {}. {}", pos + 1, step.text);
                    }
                }
            }
        }
        StudyItem::Note(note) => {
            println!("{}", note.title());
            println!("{}", note.body());
        }
    }

    if let Some(correct) = visit.verdict() {
        verdict(correct);
    } else if let Some(previous) = player.recorded_result() {
        println!("(answered earlier: {})", if previous { "correct" } else { "incorrect" });
    }
}

fn matched_right(visit: &ItemVisit, left: ChoiceId) -> Option<ChoiceId> {
    match visit.draft() {
        Draft::Matching { matches } => matches.get(&left).copied(),
        _ => None,
    }
}

pub fn verdict(correct: bool) {
    if correct {
        println!("✓ correct");
    } else {
        println!("✗ incorrect");
    }
}

pub fn progress(progress: &SessionProgress) {
    println!(
        "item {}/{} · answered {} · correct {} · {} to go",
        progress.position, progress.total, progress.answered, progress.correct, progress.remaining
    );
}

/// Toasts go to stderr so they stand apart from the item text.
pub fn notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => eprintln!("· {}", notice.message),
        NoticeLevel::Success => eprintln!("✓ {}", notice.message),
        NoticeLevel::Error => eprintln!("! {}", notice.message),
    }
}

pub fn summary(report: &FinishReport) {
    for n in &report.notices {
        notice(n);
    }
    let summary = &report.summary;
    let minutes = (summary.finished_at() - summary.started_at()).num_minutes();
    println!();
    println!("Session complete");
    println!(
        "  {} of {} scored items correct ({}%)",
        summary.correct(),
        summary.scored_items(),
        summary.accuracy_percent()
    );
    println!("  answered {} of {} items in {minutes} min", summary.answered(), summary.total_items());
    if let Some(outcome) = &report.outcome {
        if let Some(level) = outcome.level {
            println!("  level {level}");
        }
    }
}
