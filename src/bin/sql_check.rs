use tracing_subscriber::EnvFilter;
use twoway_sql::{Arguments, TwoWaySql};

/// Reads one statement per line from stdin, prints its node tree and the SQL
///  it builds with no arguments (every variable null).
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Arguments::new();
    for line in std::io::stdin().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                std::process::exit(1);
            }
        };
        let now = std::time::Instant::now();
        let res = TwoWaySql::parse(&line);
        print!("[in {}μs] ", now.elapsed().as_micros());
        let sql = match res {
            Err(e) => {
                println!("Error analyzing input: {e}");
                continue;
            }
            Ok(sql) => sql,
        };
        print!("{sql}");
        match sql.build(&args) {
            Err(e) => println!("Error building: {e}"),
            Ok(built) => println!("=> {} {:?}", built.sql, built.binds),
        }
    }
}
