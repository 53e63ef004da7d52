//! Terminal output macros.
//!
//! All user-facing lines go through these so that greppable mode can silence
//! them wholesale and accessible mode can strip the colored sigils that
//! confuse screen readers.

/// Prints a result line, gated on greppable and accessible modes.
#[macro_export]
macro_rules! output {
    ($name:expr, $greppable:expr, $accessible:expr) => {
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                use ::colored::Colorize;
                println!("{} {}", "[~]".green(), $name);
            }
        }
    };
}

/// Prints a warning line, gated on greppable and accessible modes.
#[macro_export]
macro_rules! warning {
    ($name:expr) => {
        {
            use ::colored::Colorize;
            println!("{} {}", "[!]".red(), $name);
        }
    };
    ($name:expr, $greppable:expr, $accessible:expr) => {
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                use ::colored::Colorize;
                println!("{} {}", "[!]".red(), $name);
            }
        }
    };
}

/// Prints a progress detail line, gated on greppable and accessible modes.
#[macro_export]
macro_rules! detail {
    ($name:expr, $greppable:expr, $accessible:expr) => {
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                use ::colored::Colorize;
                println!("{} {}", "[>]".blue(), $name);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn macros_expand() {
        // Exercises every branch so a broken expansion fails to compile.
        output!("result", false, false);
        output!("result", false, true);
        output!("result", true, false);
        warning!("warning");
        warning!("warning", false, false);
        warning!("warning", false, true);
        detail!("detail", false, false);
        detail!("detail", true, true);
    }
}
