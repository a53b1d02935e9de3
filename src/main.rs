use wordsh::Interpreter;
use wordsh::config::Config;
use wordsh::env::Environment;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let env = Environment::new();
    let config = Config::from_env(&env);
    let mut interpreter = Interpreter::with_config(config, env);

    match interpreter.repl() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("wordsh: {:#}", e);
            std::process::exit(1);
        }
    }
}
