// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The bundled default tick: a short wood-block strike, 44.1kHz mono.

/// Sample rate of [`TICK`].
pub const TICK_RATE: u32 = 44100;

/// Channel count of [`TICK`].
pub const TICK_CHANNELS: u16 = 1;

#[rustfmt::skip]
pub const TICK: [i16; 1470] = [
    0, 0, -1, 2, -3, 3, -2, 0, 3, -6, 8, -9,
    8, -6, 1, 4, -9, 13, -15, 14, -9, 3, 5, -13,
    18, -21, 19, -13, 5, 6, -16, 23, -27, 25, -18, 7,
    6, -18, 28, -32, 31, -23, 10, 5, -20, 32, -38, 37,
    0, 1416, 4393, 8346, 12588, 16457, 19433, 18192, 16358, 14286, 12302, 10660,
    9508, 8870, 8650, 8651, 8608, 8239, 7284, 5558, 2980, -408, -4435, -8822,
    -13209, -17205, -20431, -22571, -23412, -22868, -20995, -17980, -14118, -9775, -5340, -1181,
    2404, 5213, 7162, 8289, 8734, 8716, 8491, 8310, 8380, 8830, 9691, 10888,
    12256, 13558, 14523, 14889, 14438, 13036, 10653, 7375, 3400, -990, -5451, -9627,
    -13185, -15859, -17477, -17981, -17429, -15981, -13879, -11407, -8856, -6483, -4482, -2957,
    -1920, -1291, -918, -607, -152, 624, 1844, 3547, 5686, 8122, 10647, 13005,
    14927, 16169, 16543, 15944, 14367, 11909, 8756, 5167, 1438, -2131, -5273, -7782,
    -9537, -10509, -10760, -10429, -9708, -8806, -7927, -7230, -6814, -6700, -6835, -7099,
    -7325, -7330, -6941, -6026, -4516, -2422, 164, 3077, 6093, 8961, 11430, 13283,
    14357, 14571, 13930, 12523, 10513, 8114, 5562, 3087, 883, -910, -2226, -3072,
    -3521, -3699, -3759, -3856, -4122, -4642, -5442, -6480, -7655, -8816, -9789, -10396,
    -10484, -9949, -8751, -6925, -4575, -1868, 985, 3760, 6239, 8238, 9630, 10354,
    10424, 9920, 8975, 7755, 6435, 5177, 4105, 3291, 2750, 2440, 2270, 2119,
    1860, 1373, 576, -567, -2032, -3741, -5564, -7340, -8891, -10051, -10684, -10705,
    -10089, -8875, -7164, -5104, -2875, -663, 1359, 3051, 4325, 5145, 5537, 5573,
    5363, 5032, 4703, 4478, 4421, 4550, 4835, 5202, 5548, 5751, 5695, 5288,
    4475, 3249, 1657, -205, -2202, -4174, -5960, -7409, -8407, -8883, -8822, -8262,
    -7291, -6031, -4622, -3208, -1911, -825, 1, 561, 895, 1074, 1191, 1343,
    1612, 2058, 2698, 3513, 4441, 5387, 6237, 6874, 7191, 7110, 6591, 5642,
    4317, 2710, 946, -832, -2486, -3893, -4961, -5639, -5921, -5845, -5482, -4930,
    -4292, -3668, -3137, -2747, -2513, -2410, -2386, -2364, -2263, -2005, -1531, -813,
    142, 1288, 2549, 3822, 4992, 5949, 6596, 6868, 6734, 6207, 5336, 4206,
    2922, 1599, 348, -741, -1602, -2208, -2564, -2709, -2703, -2622, -2542, -2525,
    -2615, -2825, -3139, -3510, -3874, -4153, -4267, -4153, -3766, -3095, -2159, -1013,
    262, 1569, 2802, 3863, 4670, 5169, 5339, 5193, 4776, 4155, 3415, 2641,
    1913, 1289, 806, 471, 263, 142, 52, -69, -274, -602, -1069, -1665,
    -2353, -3074, -3756, -4320, -4693, -4819, -4663, -4220, -3514, -2599, -1548, -447,
    616, 1559, 2320, 2859, 3165, 3252, 3159, 2941, 2660, 2378, 2143, 1988,
    1924, 1937, 1996, 2054, 2057, 1953, 1702, 1281, 690, -47, -885, -1760,
    -2600, -3330, -3885, -4216, -4295, -4122, -3719, -3132, -2423, -1662, -916, -246,
    305, 715, 982, 1125, 1180, 1192, 1206, 1263, 1390, 1598, 1878, 2203,
    2531, 2811, 2992, 3027, 2884, 2548, 2028, 1352, 565, -270, -1089, -1827,
    -2428, -2852, -3080, -3113, -2971, -2693, -2327, -1926, -1537, -1199, -937, -757,
    -649, -590, -543, -472, -341, -124, 192, 602, 1086, 1609, 2122, 2576,
    2921, 3116, 3134, 2966, 2620, 2124, 1522, 863, 205, -402, -915, -1305,
    -1560, -1685, -1701, -1637, -1532, -1422, -1337, -1300, -1318, -1384, -1479, -1573,
    -1631, -1620, -1510, -1284, -938, -484, 52, 632, 1209, 1736, 2168, 2471,
    2621, 2613, 2456, 2174, 1802, 1382, 955, 559, 224, -34, -212, -319,
    -375, -408, -445, -512, -628, -800, -1024, -1283, -1551, -1797, -1984, -2081,
    -2065, -1923, -1654, -1273, -807, -290, 234, 726, 1148, 1472, 1682, 1773,
    1756, 1651, 1485, 1289, 1094, 924, 795, 712, 670, 655, 646, 618,
    548, 418, 219, -49, -375, -737, -1105, -1448, -1731, -1926, -2013, -1981,
    -1833, -1582, -1252, -873, -479, -104, 226, 490, 678, 790, 837, 836,
    808, 777, 762, 776, 825, 905, 1005, 1106, 1186, 1221, 1193, 1086,
    897, 631, 301, -69, -451, -815, -1131, -1374, -1527, -1584, -1546, -1426,
    -1243, -1022, -788, -565, -372, -219, -112, -44, -5, 22, 54, 108,
    196, 323, 488, 682, 887, 1084, 1249, 1361, 1402, 1362, 1238, 1036,
    771, 463, 139, -177, -460, -690, -856, -951, -981, -955, -890, -803,
    -714, -636, -581, -553, -549, -561, -574, -575, -548, -479, -362, -196,
    14, 255, 508, 754, 969, 1135, 1237, 1265, 1219, 1103, 932, 723,
    497, 273, 69, -100, -227, -311, -357, -374, -376, -376, -387, -417,
    -470, -545, -634, -726, -807, -860, -873, -835, -741, -593, -399, -171,
    74, 315, 534, 715, 844, 915, 929, 889, 808, 698, 576, 457,
    351, 267, 208, 171, 151, 136, 117, 81, 23, -64, -179, -316,
    -465, -613, -746, -848, -908, -917, -871, -773, -629, -453, -259, -63,
    118, 273, 393, 472, 512, 518, 499, 466, 430, 400, 383, 382,
    397, 420, 445, 462, 460, 430, 367, 270, 141, -13, -181, -350,
    -505, -634, -726, -773, -773, -730, -648, -538, -413, -284, -164, -61,
    19, 75, 110, 128, 137, 146, 162, 192, 238, 299, 371, 447,
    517, 572, 602, 599, 560, 484, 375, 240, 89, -66, -212, -338,
    -436, -501, -530, -527, -497, -447, -387, -327, -273, -230, -202, -186,
    -179, -175, -168, -149, -113, -58, 17, 110, 213, 320, 420, 503,
    562, 590, 583, 541, 469, 373, 261, 144, 31, -69, -149, -207,
    -243, -258, -258, -249, -237, -230, -230, -241, -261, -288, -316, -338,
    -349, -342, -313, -260, -184, -89, 18, 130, 237, 331, 404, 451,
    469, 460, 426, 372, 306, 235, 167, 107, 60, 25, 3, -10,
    -18, -26, -40, -63, -98, -144, -198, -256, -313, -361, -394, -408,
    -398, -363, -305, -228, -139, -43, 51, 136, 205, 256, 286, 296,
    289, 269, 243, 214, 189, 170, 159, 156, 157, 160, 160, 153,
    134, 102, 55, -4, -73, -147, -218, -282, -332, -363, -372, -360,
    -327, -277, -216, -148, -81, -20, 32, 71, 98, 112, 118, 118,
    117, 118, 125, 138, 158, 183, 208, 231, 247, 251, 241, 215,
    173, 117, 51, -20, -91, -156, -210, -249, -272, -277, -266, -242,
    -209, -173, -136, -103, -76, -57, -45, -38, -33, -28, -18, -2,
    21, 53, 92, 135, 177, 216, 246, 264, 268, 256, 228, 186,
    135, 78, 20, -35, -82, -118, -142, -155, -158, -152, -142, -130,
    -120, -113, -111, -114, -119, -126, -131, -130, -122, -105, -78, -41,
    3, 52, 101, 147, 185, 213, 228, 229, 217, 193, 161, 123,
    85, 48, 17, -8, -26, -37, -43, -45, -47, -51, -59, -71,
    -87, -107, -129, -149, -165, -174, -174, -163, -142, -110, -71, -27,
    18, 62, 100, 129, 149, 158, 158, 149, 134, 116, 98, 81,
    67, 57, 52, 49, 47, 45, 40, 30, 15, -6, -32, -62,
    -92, -122, -146, -164, -173, -171, -160, -139, -111, -78, -43, -9,
    21, 45, 63, 74, 79, 79, 76, 72, 69, 69, 71, 75,
    82, 90, 96, 100, 98, 90, 75, 54, 26, -5, -37, -69,
    -97, -119, -133, -139, -137, -127, -111, -92, -70, -50, -31, -16,
    -5, 2, 6, 8, 11, 14, 20, 30, 42, 57, 74, 90,
    104, 114, 118, 116, 106, 90, 68, 41, 13, -15, -40, -61,
    -76, -86, -89, -87, -81, -73, -64, -56, -50, -46, -44, -44,
    -45, -45, -43, -37, -29, -15, 1, 21, 42, 63, 82, 97,
    106, 109, 106, 97, 82, 64, 44, 24, 6, -10, -22, -31,
    -35, -37, -37, -36, -36, -38, -41, -46, -53, -60, -66, -71,
    -72, -70, -62, -51, -35, -15, 5, 26, 46, 62, 74, 81,
    82, 79, 72, 63, 52, 40, 30, 22, 16, 12, 9, 8,
    6, 4, -1, -7, -16, -27, -39, -51, -62, -71, -77, -78,
    -75, -67, -55, -40, -23, -6, 10, 24, 35, 43, 47, 48,
    46, 43, 39, 36, 33, 32, 33, 34, 36, 37, 37, 35,
    30, 22, 12, -1, -15, -29, -43, -54, -62, -67, -68, -64,
    -57, -48, -37, -25, -14, -5, 3, 9, 12, 14, 15, 15,
    16, 18, 21, 26, 31, 37, 43, 47, 50, 50, 47, 41,
    32, 21, 8, -5, -18, -29, -38, -44, -47, -47, -45, -40,
    -35, -29, -24, -19, -16, -14, -13, -13, -12, -11, -8, -4,
    2, 9, 18, 27, 35, 42, 48, 50, 50, 47, 41, 33,
    23, 13, 3, -6, -14, -19, -23, -24, -24, -23, -22, -21,
    -20, -21, -22, -24, -26, -27, -28, -28, -26, -22, -16, -8,
    1, 11, 20, 28, 35, 39, 41, 41, 38, 33, 27, 21,
    15, 9, 4, 1, -1, -3, -3, -4, -5, -7, -9, -12,
    -17, -21, -26, -30, -33, -34, -34, -31, -26, -20, -12, -4,
    4, 12, 18, 23, 26, 27, 26, 25, 22, 19, 17, 15,
    13, 12, 12, 12, 12, 12, 10, 8, 4, -1, -6, -12,
    -18, -24, -28, -31, -32, -31, -29, -25, -19, -13, -7, -2,
    3, 7, 9, 11, 12, 12, 11, 11, 11, 12, 13, 15,
    17, 19, 20, 21, 20, 18, 15, 10, 5, -1, -8, -13,
    -18, -22, -24, -24, -24, -22, -19, -15, -12, -9, -6, -4,
    -3, -2, -2, -1, -1, 1, 2, 5, 8, 11, 15, 18,
    21, 22, 23, 22, 20, 16, 12, 7, 2, -3, -7, -11,
    -13, -14, -14, -14, -13, -12, -11, -10, -9, -9, -10, -10,
    -10, -10, -10, -8, -6, -3,
];
