/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::gluster::runner::CommandError;
use std::fmt::{Display, Formatter};

/// `lvextend` exits with 5 when the volume already has the requested size.
pub const RESIZE_NOOP_MARKER: &str = "lvextend";
pub const RESIZE_NOOP_EXIT_CODE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTolerance {
    None,
    IgnoreExitCode {
        code: i32,
        when_command_contains: &'static str,
    },
}

/// A single shell instruction, run through `bash -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    tolerance: ExitTolerance,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tolerance: ExitTolerance::None,
        }
    }

    pub fn resize(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tolerance: ExitTolerance::IgnoreExitCode {
                code: RESIZE_NOOP_EXIT_CODE,
                when_command_contains: RESIZE_NOOP_MARKER,
            },
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tolerance(&self) -> ExitTolerance {
        self.tolerance
    }

    pub fn tolerates(&self, error: &CommandError) -> bool {
        match self.tolerance {
            ExitTolerance::None => false,
            ExitTolerance::IgnoreExitCode {
                code,
                when_command_contains,
            } => self.text.contains(when_command_contains) && error.exit_code() == Some(code),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
