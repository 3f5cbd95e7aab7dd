// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Public data types of the rendering contracts.

pub mod buffer;
pub mod context;
pub mod effect;
pub mod instance;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod state;

pub use self::buffer::*;
pub use self::context::*;
pub use self::effect::*;
pub use self::instance::*;
pub use self::material::*;
pub use self::mesh::*;
pub use self::scene::*;
pub use self::state::*;
