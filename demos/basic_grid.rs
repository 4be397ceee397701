/// Basic Grid Example
///
/// This example demonstrates:
/// - Loading a table from CSV text
/// - Text, regex and select filters
/// - Column sorting and page navigation
/// - Adding, updating and deleting records

use datatable::{
    CellValue, DataTable, FilterKind, FilterValue, Identify, Options, Record, SelectFilter, SortDirection,
    SortSpec, Source, TextRenderer,
};

const CSV: &str = "id,name,department,salary
1,Alice,Engineering,98000
2,Bob,Sales,61000
3,Charlie,Engineering,105000
4,Diana,Marketing,72000
5,<em>Eve</em>,Engineering,88000
6,Frank,Sales,57000
7,Grace,Marketing,79000
8,Heidi,Engineering,121000
9,Ivan,Sales,64000
10,Judy,Marketing,70000
11,Mallory,Engineering,93000
12,Niaj,Sales,59000
";

fn show(title: &str, table: &DataTable<TextRenderer>) {
    println!("--- {} ---", title);
    println!("{}\n", table.renderer().output());
}

fn main() -> datatable::Result<()> {
    println!("=== DataTable Basic Grid Example ===\n");

    let options = Options::new()
        .page_size(4)
        .pages_shown(3)
        .sort(SortSpec::All)
        .sort_by("id", SortDirection::Asc)
        .identify(Identify::by_field("id"))
        .filter("name", FilterKind::Text)
        .filter("department", FilterKind::Select(SelectFilter::auto()))
        .filter("salary", FilterKind::Regex)
        .on_page_change(|from, to| println!("(page {} -> {})", from, to));

    let mut table = DataTable::new(
        Source::Csv {
            text: CSV.to_string(),
            has_header: true,
        },
        options,
        TextRenderer::new(),
    )?;
    show("initial view", &table);

    table.load_page(3);
    show("page 3", &table);

    table.toggle_sort("salary");
    show("sorted by salary", &table);
    table.toggle_sort("salary");
    show("sorted by salary, descending", &table);

    table.set_filter("department", FilterValue::selection(["Engineering"]))?;
    show("engineering only", &table);

    table.set_filter("name", FilterValue::text("e"))?;
    show("engineering, name contains 'e'", &table);

    if let Err(e) = table.set_filter("salary", FilterValue::text("(")) {
        println!("rejected regex: {}\n", e);
    }
    table.reset_filters();

    table.set_filter("salary", FilterValue::text("^1\\d{5}$"))?;
    show("six-figure salaries", &table);
    table.reset_filters();

    table.add(Record::from_pairs(vec![
        ("id", CellValue::from(13)),
        ("name", CellValue::from("Olivia")),
        ("department", CellValue::from("Engineering")),
        ("salary", CellValue::from(130000)),
    ]));
    show("after adding Olivia", &table);

    table.update(
        CellValue::from(2),
        Record::from_pairs(vec![("salary", CellValue::from(140000))]),
    );
    show("after Bob's raise", &table);

    let removed = table.delete_all(|r| r.get("department") == Some(&CellValue::from("Sales")));
    println!("deleted {} sales records", removed);
    table.delete(CellValue::from(8));
    show("after deletions", &table);

    Ok(())
}
