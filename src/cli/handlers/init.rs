use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::store_io;

const CONFIG_TEMPLATE: &str = r##"# taskboard configuration. Every setting is optional.

[drag]
# Pointer travel in pixels before a press becomes a drag
activation_distance = 8.0

[timeline]
day_width = 100.0
days = 28

[remote]
page_size = 20
bulk_limit = 50

[viewport]
row_height = 56.0
overscan = 3

# --- Board columns ---
# Columns appear left to right. Hidden columns keep their tasks off the board.
# Tasks whose status has no column are shown in the first visible column.

[[board.columns]]
id = "backlog"
title = "Backlog"
status = "backlog"
visible = false

[[board.columns]]
id = "todo"
title = "To Do"
status = "todo"

[[board.columns]]
id = "in_progress"
title = "In Progress"
status = "in_progress"

[[board.columns]]
id = "review"
title = "Review"
status = "review"

[[board.columns]]
id = "done"
title = "Done"
status = "done"
"##;

pub fn cmd_init(args: InitArgs, store: &Path, config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    store_io::init_store(store)?;
    println!("created {}", store.display());

    if args.no_config {
        return Ok(());
    }
    if config.exists() {
        println!("kept existing {}", config.display());
    } else {
        fs::write(config, CONFIG_TEMPLATE)?;
        println!("created {}", config.display());
    }
    Ok(())
}
