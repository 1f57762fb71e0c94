use jogja_report::{csv, PageBreakPolicy, Renderer};

fn main() {
    let file = std::env::args().nth(1).expect("Missing filename");
    println!("opening {file}");
    let table = csv::load(&file).unwrap();
    let rows = table.row_count();

    let renderer = Renderer::default();
    let policy = PageBreakPolicy::new(renderer.geometry()).unwrap();
    let document = renderer.render(table, &format!("Data from {file}")).unwrap();

    for column in document.plan.columns() {
        println!("{:<20} {:>7.2} mm", column.name, column.width);
    }
    for (index, range) in policy.paginate(rows).into_iter().enumerate() {
        println!("page {}: rows {}..{}", index + 1, range.start, range.end);
    }
}
