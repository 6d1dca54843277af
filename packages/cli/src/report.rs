//! Plain-text tables printed after a command finishes.

use fitness_map_classify::KeywordTable;
use fitness_map_location_models::Category;
use fitness_map_pipeline::summary::Summary;

pub fn print_summary(summary: &Summary) {
    println!();
    println!("Locations:          {}", summary.total_locations);
    println!("Skipped (invalid):  {}", summary.skipped);
    println!("Duplicates removed: {}", summary.duplicates_removed);
    println!("Out of bounds:      {}", summary.out_of_bounds);
    println!("Excluded:           {}", summary.excluded);

    if summary.total_locations == 0 {
        return;
    }

    if let Some(rating) = summary.average_rating {
        println!("Average rating:     {rating:.2}");
    }
    println!(
        "With website/phone/rating: {}/{}/{}",
        summary.locations_with_websites,
        summary.locations_with_phones,
        summary.locations_with_ratings
    );

    println!();
    println!("{:<24} {:<8} AVG INCOME", "CATEGORY", "COUNT");
    for &category in Category::all() {
        let Some(count) = summary.categories.get(&category) else {
            continue;
        };
        let income = summary
            .average_income_by_category
            .get(&category)
            .copied()
            .unwrap_or_default();
        println!("{:<24} {:<8} {income:.0}", category.label(), count);
    }

    if let Some(stats) = summary.income_statistics {
        println!();
        println!(
            "Income: min {:.0}, median {:.0}, mean {:.0}, max {:.0}",
            stats.min, stats.median, stats.mean, stats.max
        );
    }

    println!();
    println!("{:<30} COUNT", "PLANNING AREA");
    let mut areas: Vec<(&String, &usize)> = summary.planning_areas.iter().collect();
    areas.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (area, count) in areas {
        println!("{area:<30} {count}");
    }

    if !summary.top_rated_locations.is_empty() {
        println!();
        println!("{:<6} {:<40} {:<24} AREA", "RATING", "NAME", "CATEGORY");
        for entry in &summary.top_rated_locations {
            println!(
                "{:<6.1} {:<40} {:<24} {}",
                entry.rating,
                entry.name,
                entry.category.label(),
                entry.planning_area
            );
        }
    }
}

pub fn print_rules(table: &KeywordTable) {
    println!("Keyword table version {}", table.version());
    println!();
    println!("{:<6} {:<24} KEYWORDS", "RANK", "CATEGORY");
    for rule in table.categories() {
        println!(
            "{:<6} {:<24} {}",
            rule.rank,
            rule.category.label(),
            rule.keywords.join(", ")
        );
    }
    println!("{:<6} {:<24} (fallback)", "-", Category::Others.label());

    let exclusions = table.exclusions();
    println!();
    println!("Always kept: {}", exclusions.allow.join(", "));
    for rule in &exclusions.deny {
        if rule.unless.is_empty() {
            println!("Excluded: {}", rule.keywords.join(", "));
        } else {
            println!(
                "Excluded: {} (unless {})",
                rule.keywords.join(", "),
                rule.unless.join(", ")
            );
        }
    }
}
