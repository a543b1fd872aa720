// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

mod chat_image_api_test;
mod daily_crawl_flow_test;
mod helpers;
mod news_api_test;
