/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

#![forbid(unsafe_code)]

use authz_equiv_cli::{
    compare, run, translate_filter, translate_residual, AuthzEquivExitCode, Cli, Commands,
};

use clap::Parser;

fn main() -> AuthzEquivExitCode {
    let cli = Cli::parse();
    cli.logging.init();
    match cli.command {
        Commands::TranslateResidual(args) => translate_residual(&args),
        Commands::TranslateFilter(args) => translate_filter(&args),
        Commands::Compare(args) => compare(&args),
        Commands::Run(args) => run(&args),
    }
}
